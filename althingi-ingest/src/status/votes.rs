//! Vote casting type and conclusion vocabulary used by status derivation
//!
//! The feed's vote casting types and conclusions are free text. These are
//! the strings the derivation recognizes; anything else is treated as
//! inconclusive evidence rather than guessed at.

/// Advancement vote after the first debate of a bill.
pub const ADVANCE_TO_ITERATION_2: &[&str] = &["vísun til 2. umræðu"];

/// Advancement vote after the second debate of a bill.
pub const ADVANCE_TO_ITERATION_3: &[&str] = &["vísun til 3. umræðu"];

/// Advancement vote after the former debate of a motion.
pub const ADVANCE_TO_LATTER: &[&str] = &["vísun til síðari umræðu"];

/// Final-passage votes (bills and motions; a motion may be voted on in
/// parts, yielding several of these).
pub const FINAL_VOTES: &[&str] = &["lokaatkvæðagreiðsla"];

/// Referral of the issue to the government instead of passage.
pub const REFERRED_TO_GOVERNMENT: &[&str] = &["vísun til ríkisstjórnar"];

/// Conclusion strings with a recognized meaning.
pub const CONCLUSION_APPROVED: &str = "samþykkt";
pub const CONCLUSION_REJECTED: &str = "fellt";
