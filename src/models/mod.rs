pub mod class;
pub mod schedule;
pub mod teacher;

pub use class::{
    Class, ClassName, NewClassRequest, RequirementRow, RequirementsRequest, SubjectRequirement,
    UpdateClassRequest,
};
pub use schedule::ScheduleEntry;
pub use teacher::{Availability, NewTeacherRequest, Teacher};
