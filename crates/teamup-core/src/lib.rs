//! Event lifecycle core for the `TeamUp` coordination bot.
//!
//! Users announce a timed event, others join or leave through controls on
//! the announcement, and once the headcount is met every participant is
//! asked privately to confirm readiness before the event is declared
//! started.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `teamup.yaml`.
//! - [`content`] -- Announcement, prompt and notice texts and controls.
//! - [`event`] -- Per-event state and deadlines.
//! - [`lifecycle`] -- The per-event state machine task.
//! - [`memory`] -- In-memory [`Messenger`] for tests and local runs.
//! - [`messenger`] -- The [`Messenger`] trait consumed from the chat platform.
//! - [`notify`] -- Best-effort "event started" fan-out.
//! - [`readiness`] -- Readiness confirmation rounds.
//! - [`registry`] -- Concurrent registry of active events.
//! - [`roster`] -- Idempotent participant roster.
//! - [`service`] -- Event creation and handles.
//!
//! [`Messenger`]: messenger::Messenger

pub mod config;
pub mod content;
pub mod event;
pub mod lifecycle;
pub mod memory;
pub mod messenger;
pub mod notify;
pub mod readiness;
pub mod registry;
pub mod roster;
pub mod service;
