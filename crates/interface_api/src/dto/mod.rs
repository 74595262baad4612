//! Request and response bodies

pub mod onboarding;
