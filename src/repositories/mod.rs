pub(crate) mod access_log;
pub(crate) mod exam_sessions;
pub(crate) mod exams;
pub(crate) mod users;
