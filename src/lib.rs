#![deny(missing_docs)]

//! Core library for the threadbrief WhatsApp digest service.

/// HTTP routing and webhook handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Bounded background execution of digest jobs.
pub mod dispatch;
/// Structured logging and tracing setup.
pub mod logging;
/// Webhook and digest counters.
pub mod metrics;
/// Search, summarize, and reply flow for a single question.
pub mod pipeline;
/// Reddit API client and multi-query search.
pub mod reddit;
/// Fixed-interval retry policies for external calls.
pub mod retry;
/// LLM summarization client abstraction and adapters.
pub mod summarization;
/// Markup cleanup and word-limit truncation.
pub mod text;
/// WhatsApp webhook payload decoding.
pub mod webhook;
/// WhatsApp Cloud API messaging.
pub mod whatsapp;
