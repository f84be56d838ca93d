//! Handlers for events published by the member service.

mod change_student_name;

pub use change_student_name::{ChangeStudentNameCommand, ChangeStudentNameHandler, NameChangeConsumer};
