//! Tests wiring several components together through fake voice and audio backends

pub mod music_session;
