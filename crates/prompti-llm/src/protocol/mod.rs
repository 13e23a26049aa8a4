//! Vendor wire formats
//!
//! Request types are serialize-only and mirror what each vendor expects.
//! Response types deserialize leniently: every field defaults, so a vendor
//! adding or omitting fields never breaks decoding.

pub mod anthropic;
pub mod openai;
