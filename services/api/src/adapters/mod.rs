pub mod db;
pub mod grading_llm;
pub mod mail;
pub mod question_llm;
pub mod tts;

pub use db::DbAdapter;
pub use grading_llm::OpenAiGradingAdapter;
pub use mail::{HttpMailAdapter, LogMailAdapter};
pub use question_llm::OpenAiQuestionAdapter;
pub use tts::OpenAiTtsAdapter;
