//! Oracle backends. Currently a single OpenAI-compatible chat service.

pub mod chat_service;
