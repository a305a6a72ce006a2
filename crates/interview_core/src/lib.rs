pub mod domain;
pub mod error;
pub mod grading;
pub mod interview;
pub mod locks;
pub mod memory;
pub mod notifications;
pub mod otp;
pub mod ports;

pub use domain::{
    GradeRecord, GradeReport, Interview, InterviewMode, InterviewStatus, Message, MessageRole,
    OtpCredential, ProfileUpdate, Turn, User, UserStats,
};
pub use error::{ServiceError, ServiceResult};
pub use grading::{Grader, GradingEvent, GradingQueue};
pub use interview::{CreatedInterview, InterviewService, NewInterview, Question, TurnOutcome};
pub use locks::InterviewLocks;
pub use memory::InMemoryDatabase;
pub use otp::OtpService;
pub use ports::{
    DatabaseService, GradingService, MailService, OutgoingEmail, PortError, PortResult,
    QuestionGenerationService, QuestionRequest, TextToSpeechService,
};
