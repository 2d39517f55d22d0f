pub mod openai;
pub mod openai_client;
pub mod openai_translate;
pub(crate) mod translator_contract;
