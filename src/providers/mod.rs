//! 内置翻译供应商

pub mod deepl;
pub mod deeplx;
pub mod google;
pub mod openai;

pub use deepl::DeepLAdapter;
pub use deeplx::DeepLXAdapter;
pub use google::GoogleAdapter;
pub use openai::OpenAiAdapter;
