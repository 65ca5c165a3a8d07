pub mod domain;
pub mod ledger;
pub mod ports;
pub mod quran;
pub mod session;
pub mod stats;

pub use domain::{
    DomainError, EntryStatus, MemorizationEntry, RangeAddition, ReviewEvent,
    ReviewerVerification, RevisionRecord, SessionKind, StudySession, User, UserCredentials,
    VaultEntry, VaultStatus, VerifiedMemorization,
};
pub use ports::{MemorizationStore, PortError, PortResult};
pub use quran::{Surah, VerseRange};
