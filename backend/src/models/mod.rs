pub mod attendance;
pub mod classroom;
pub mod department;
pub mod program;
pub mod session;
pub mod subject;
pub mod teacher;

pub use attendance::{
    Attendance, AttendanceExportRow, AttendanceStatus, NewAttendanceRequest,
    UpdateAttendanceRequest,
};
pub use classroom::{ClassRoom, NewClassRoomRequest, RoomType, UpdateClassRoomRequest};
pub use department::{Department, DepartmentSummary, NewDepartmentRequest, UpdateDepartmentRequest};
pub use program::{NewProgramRequest, Program, ProgramSummary, ProgramType, UpdateProgramRequest};
pub use session::{
    DayOfWeek, NewSessionRequest, ScheduleRow, Session, SessionListItem, SessionStatus,
    UpdateSessionRequest,
};
pub use subject::{
    NewSubjectRequest, Subject, SubjectDetail, SubjectType, TeacherSubject, UpdateSubjectRequest,
};
pub use teacher::{
    Gender, NewTeacherRequest, Teacher, TeacherOption, TeacherStatus, TeacherWorkload,
    UpdateTeacherRequest,
};

use serde::Serialize;

/// One page of a filtered list.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}
