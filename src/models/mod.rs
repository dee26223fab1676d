pub mod credentials;
pub mod lenient;
pub mod records;

pub use credentials::{Credentials, ExtractType, ExtractionRequest};
pub use records::{
    ContactRecord,
    GroupRecord,
    InviteLink,
    MemberCount,
    MembershipRecord,
    SelectedItem,
    LINK_UNAVAILABLE,
    NOT_AVAILABLE,
};
