//! Prefixed identifiers.
//!
//! Every entity id is `<PREFIX>-<12 lowercase hex chars>`, except medical ids
//! which use the patient-facing `MID-<year>-<8 uppercase hex chars>` form.
//! Prefixes are cosmetic: nothing in the access layer infers a type from them.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

const MAX_ID_LEN: usize = 64;

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

fn validate(kind: &'static str, value: &str) -> Result<()> {
    let well_formed = !value.is_empty()
        && value.len() <= MAX_ID_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if well_formed {
        Ok(())
    } else {
        Err(CoreError::invalid_id(kind, value))
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self> {
                validate($kind, s)?;
                Ok(Self(s.to_string()))
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(value: String) -> Result<Self> {
                validate($kind, &value)?;
                Ok(Self(value))
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

macro_rules! generated_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $prefix:literal) => {
        string_id!($(#[$meta])* $name, $kind);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Generates a fresh random identifier.
            pub fn generate() -> Self {
                Self(format!("{}-{}", $prefix, random_hex(6)))
            }
        }
    };
}

generated_id!(
    /// Login account identifier (`USR-…`).
    AccountId,
    "account",
    "USR"
);
generated_id!(
    /// Sealed clinical record identifier.
    RecordId,
    "record",
    "REC"
);
generated_id!(PrescriptionId, "prescription", "PRC");
generated_id!(AppointmentId, "appointment", "APT");
generated_id!(AuditId, "audit", "AUD");

string_id!(
    /// Public-facing patient identifier and the join key for all clinical data.
    MedicalId,
    "medical"
);

impl MedicalId {
    /// Generates a medical id of the form `MID-<year>-<8 uppercase hex>`.
    pub fn generate(year: i32) -> Self {
        Self(format!("MID-{year}-{}", random_hex(4).to_ascii_uppercase()))
    }
}

string_id!(
    /// Doctor or hospital identifier, the unit of consent.
    ProfessionalId,
    "professional"
);

impl ProfessionalId {
    pub fn generate(kind: crate::role::ProfessionalKind) -> Self {
        Self(format!("{}-{}", kind.id_prefix(), random_hex(6)))
    }
}

string_id!(
    /// Whoever performed an audited action: an account id for patients and
    /// admins, a professional id for doctors and hospitals.
    ActorId,
    "actor"
);

impl From<&AccountId> for ActorId {
    fn from(id: &AccountId) -> Self {
        Self(id.0.clone())
    }
}

impl From<&ProfessionalId> for ActorId {
    fn from(id: &ProfessionalId) -> Self {
        Self(id.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::ProfessionalKind;

    #[test]
    fn test_generated_ids_have_prefix_and_hex_suffix() {
        let id = AccountId::generate();
        let suffix = id.as_str().strip_prefix("USR-").unwrap();
        assert_eq!(suffix.len(), 12);
        assert!(hex::decode(suffix).is_ok());

        assert!(RecordId::generate().as_str().starts_with("REC-"));
        assert!(AuditId::generate().as_str().starts_with("AUD-"));
        assert_ne!(AuditId::generate(), AuditId::generate());
    }

    #[test]
    fn test_medical_id_format() {
        let id = MedicalId::generate(2024);
        let rest = id.as_str().strip_prefix("MID-2024-").unwrap();
        assert_eq!(rest.len(), 8);
        assert_eq!(rest, rest.to_ascii_uppercase());
    }

    #[test]
    fn test_professional_id_prefix_follows_kind() {
        assert!(
            ProfessionalId::generate(ProfessionalKind::Doctor)
                .as_str()
                .starts_with("DOC-")
        );
        assert!(
            ProfessionalId::generate(ProfessionalKind::Hospital)
                .as_str()
                .starts_with("HOSP-")
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("MID-2024-ABCD".parse::<MedicalId>().is_ok());
        assert!("".parse::<MedicalId>().is_err());
        assert!("MID 2024".parse::<MedicalId>().is_err());
        assert!("../etc/passwd".parse::<MedicalId>().is_err());
        assert!("x".repeat(65).parse::<ProfessionalId>().is_err());
    }

    #[test]
    fn test_serde_is_a_plain_string() {
        let id: MedicalId = "MID-2024-ABCD".parse().unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"MID-2024-ABCD\"");
        let back: MedicalId = serde_json::from_str("\"MID-2024-ABCD\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<ProfessionalId>("\"DOC 1\"").is_err());
        assert!(serde_json::from_str::<MedicalId>("\"\"").is_err());
    }
}
