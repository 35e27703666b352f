mod epic;
mod mobile;
mod module;
mod status;

pub use epic::{EpicError, EpicNumber, MAX_EPIC_LENGTH};
pub use mobile::{Mobile, MobileError};
pub use module::{gate, Gate, Module, Permissions, UnknownModule};
pub use status::{BeneficiaryStatus, Gender, Priority, ProjectStatus, ServiceType};
