use std::{fmt, num::NonZeroUsize, str::FromStr, sync::LazyLock};

use regex::Regex;

/// Prefix shared by draft and global identifiers.
pub const DRAFT_PREFIX: &str = "REQ";

/// Zero-padded width of the per-project draft counter.
pub const DRAFT_DIGITS: usize = 4;

/// Zero-padded width of the global counter.
pub const GLOBAL_DIGITS: usize = 7;

/// Zero-padded width of the base and derived numbers of an approved
/// identifier.
pub const APPROVED_DIGITS: usize = 4;

static DRAFT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^REQ-(\d+)$").expect("static pattern is valid"));

static GLOBAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^REQ-(\d{4,7})$").expect("static pattern is valid"));

static APPROVED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z0-9]{3})-([A-Z0-9]{2,3})-([A-Z0-9]{2})-(\d{4})(?:\.(\d{4}))?$")
        .expect("static pattern is valid")
});

/// Errors that can occur when parsing identifier strings.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentifierError {
    /// The string does not have the structure of the requested identifier.
    #[error("invalid identifier format: {0}")]
    Syntax(String),

    /// The numeric component was zero or did not fit.
    #[error("invalid number in identifier '{0}'")]
    Number(String),
}

/// A per-project sequential placeholder identifier, e.g. `REQ-0042`.
///
/// Parsing is lenient about case and padding so that identifiers written by
/// older versions (`req-7`, `REQ-12`) are still recognized. Formatting is
/// always canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DraftId(NonZeroUsize);

impl DraftId {
    /// Create a draft identifier from a raw counter value.
    ///
    /// Returns `None` for zero.
    #[must_use]
    pub const fn from_counter(number: usize) -> Option<Self> {
        match NonZeroUsize::new(number) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// The sequence number.
    #[must_use]
    pub const fn number(self) -> usize {
        self.0.get()
    }

    /// Whether `value` is a draft identifier written in canonical form.
    ///
    /// `REQ-0007` is canonical, `REQ-7` and `req-0007` are not.
    #[must_use]
    pub fn is_canonical(value: &str) -> bool {
        value
            .parse::<Self>()
            .is_ok_and(|id| id.to_string() == value)
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{DRAFT_PREFIX}-{:0width$}", self.0, width = DRAFT_DIGITS)
    }
}

impl FromStr for DraftId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = DRAFT_PATTERN
            .captures(s)
            .ok_or_else(|| IdentifierError::Syntax(s.to_string()))?;
        captures[1]
            .parse::<usize>()
            .ok()
            .and_then(Self::from_counter)
            .ok_or_else(|| IdentifierError::Number(s.to_string()))
    }
}

/// A lifecycle-independent identifier, unique across the whole system, e.g.
/// `REQ-0000042`.
///
/// Older data used narrower widths; parsing accepts 4 to 7 digits and
/// formatting always normalizes to 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlobalId(NonZeroUsize);

impl GlobalId {
    /// Create a global identifier from a raw counter value.
    ///
    /// Returns `None` for zero.
    #[must_use]
    pub const fn from_counter(number: usize) -> Option<Self> {
        match NonZeroUsize::new(number) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// The sequence number.
    #[must_use]
    pub const fn number(self) -> usize {
        self.0.get()
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{DRAFT_PREFIX}-{:0width$}", self.0, width = GLOBAL_DIGITS)
    }
}

impl FromStr for GlobalId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = GLOBAL_PATTERN
            .captures(s)
            .ok_or_else(|| IdentifierError::Syntax(s.to_string()))?;
        captures[1]
            .parse::<usize>()
            .ok()
            .and_then(Self::from_counter)
            .ok_or_else(|| IdentifierError::Number(s.to_string()))
    }
}

/// A structured identifier assigned once a requirement enters review.
///
/// Format: `{SYSTEM}-{SEGMENT}-{TYPE}-{BASE}` optionally followed by
/// `.{DERIVED}`, where:
/// - `SYSTEM` is the project's 3 character system code
/// - `SEGMENT` is either a subsystem code or the static `SI` marker
/// - `TYPE` is the 2 letter [`TypeCode`]
/// - `BASE` and `DERIVED` are 4 digit sequence numbers
///
/// Examples: `ABC-SI-FN-0001.0002`, `SYS-GEN-PR-0014`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApprovedId {
    system: String,
    segment: String,
    type_code: String,
    base: u32,
    derived: Option<u32>,
}

impl ApprovedId {
    /// Create an approved identifier from pre-normalized parts.
    #[must_use]
    pub fn new(prefix: &Prefix, base: u32, derived: Option<u32>) -> Self {
        Self {
            system: prefix.system.clone(),
            segment: prefix.segment.clone(),
            type_code: prefix.type_code.as_str().to_string(),
            base,
            derived,
        }
    }

    /// The system code component.
    #[must_use]
    pub fn system(&self) -> &str {
        &self.system
    }

    /// The subsystem (or static marker) component.
    #[must_use]
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// The two character type code component.
    #[must_use]
    pub fn type_code(&self) -> &str {
        &self.type_code
    }

    /// The base sequence number.
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// The derived sequence number, if the identifier has one.
    #[must_use]
    pub const fn derived(&self) -> Option<u32> {
        self.derived
    }

    /// Whether this identifier lives under the given prefix.
    #[must_use]
    pub fn has_prefix(&self, prefix: &Prefix) -> bool {
        self.system == prefix.system
            && self.segment == prefix.segment
            && self.type_code == prefix.type_code.as_str()
    }
}

impl fmt::Display for ApprovedId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{:0width$}",
            self.system,
            self.segment,
            self.type_code,
            self.base,
            width = APPROVED_DIGITS
        )?;
        if let Some(derived) = self.derived {
            write!(f, ".{derived:0width$}", width = APPROVED_DIGITS)?;
        }
        Ok(())
    }
}

impl FromStr for ApprovedId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = APPROVED_PATTERN
            .captures(s)
            .ok_or_else(|| IdentifierError::Syntax(s.to_string()))?;
        let number = |index: usize| -> Result<Option<u32>, IdentifierError> {
            captures
                .get(index)
                .map(|m| {
                    m.as_str()
                        .parse::<u32>()
                        .map_err(|_| IdentifierError::Number(s.to_string()))
                })
                .transpose()
        };
        let base = number(4)?.ok_or_else(|| IdentifierError::Syntax(s.to_string()))?;
        Ok(Self {
            system: captures[1].to_string(),
            segment: captures[2].to_string(),
            type_code: captures[3].to_string(),
            base,
            derived: number(5)?,
        })
    }
}

/// Whether `value` has the structure of an approved identifier.
///
/// Anything else is treated as a draft identifier eligible for promotion.
#[must_use]
pub fn is_approved(value: &str) -> bool {
    APPROVED_PATTERN.is_match(value)
}

/// The `{SYSTEM}-{SEGMENT}-{TYPE}` part shared by a family of approved
/// identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    /// Normalized system code.
    pub system: String,
    /// Normalized subsystem code, or the static marker.
    pub segment: String,
    /// Type code.
    pub type_code: TypeCode,
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}-{}", self.system, self.segment, self.type_code)
    }
}

/// Two letter code derived from a requirement type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    /// `FN`
    Functional,
    /// `PR`
    Performance,
    /// `EM`
    Safety,
    /// `GV`
    Security,
    /// `RG`
    Regulatory,
    /// `AR`
    Interface,
    /// `KS`
    Constraint,
    /// `TG`
    Technical,
    /// `CG`
    Environmental,
    /// `AC`
    Informational,
}

impl TypeCode {
    /// Resolve the type code for a requirement type name.
    ///
    /// Both the current English names and the localized names found in older
    /// data are accepted. Returns `None` for unknown types.
    #[must_use]
    pub fn from_requirement_type(value: &str) -> Option<Self> {
        let code = match value.trim() {
            "Functional" | "Fonksiyonel" => Self::Functional,
            "Performance" | "Performans" => Self::Performance,
            "Safety" | "Emniyet" => Self::Safety,
            "Security" | "Güvenlik" | "Guvenlik" => Self::Security,
            "Regulatory" | "Regülasyon" | "Regulasyon" => Self::Regulatory,
            "Interface" | "Arayüz" | "Arayuz" => Self::Interface,
            "Constraint" | "Kısıt" | "Kisit" => Self::Constraint,
            "Technical" | "Teknik Gereksinim" => Self::Technical,
            "Environmental" | "Çevresel Gereksinim" | "Cevresel Gereksinim" => {
                Self::Environmental
            }
            "Informational" | "Explanation" | "Açıklama" | "Aciklama" => Self::Informational,
            _ => return None,
        };
        Some(code)
    }

    /// The two letter code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Functional => "FN",
            Self::Performance => "PR",
            Self::Safety => "EM",
            Self::Security => "GV",
            Self::Regulatory => "RG",
            Self::Interface => "AR",
            Self::Constraint => "KS",
            Self::Technical => "TG",
            Self::Environmental => "CG",
            Self::Informational => "AC",
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a code: uppercase, alphanumeric only, truncated to `length`.
///
/// Returns `None` if nothing remains.
#[must_use]
pub fn normalize_code(value: &str, length: usize) -> Option<String> {
    let cleaned: String = value
        .chars()
        .flat_map(char::to_uppercase)
        .filter(char::is_ascii_alphanumeric)
        .take(length)
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(1, "REQ-0001"; "single digit")]
    #[test_case(42, "REQ-0042"; "two digits")]
    #[test_case(9999, "REQ-9999"; "at boundary")]
    #[test_case(10000, "REQ-10000"; "expansion")]
    fn draft_display(number: usize, expected: &str) {
        let id = DraftId::from_counter(number).unwrap();
        assert_eq!(id.to_string(), expected);
    }

    #[test_case(1, "REQ-0000001"; "single digit")]
    #[test_case(1234, "REQ-0001234"; "four digits")]
    fn global_display(number: usize, expected: &str) {
        let id = GlobalId::from_counter(number).unwrap();
        assert_eq!(id.to_string(), expected);
    }

    #[test]
    fn draft_parse_accepts_legacy_forms() {
        assert_eq!("REQ-7".parse::<DraftId>().unwrap().number(), 7);
        assert_eq!("req-0012".parse::<DraftId>().unwrap().number(), 12);
        assert_eq!("REQ-0003".parse::<DraftId>().unwrap().number(), 3);
    }

    #[test]
    fn draft_parse_rejects_zero_and_garbage() {
        assert!(matches!(
            "REQ-0000".parse::<DraftId>(),
            Err(IdentifierError::Number(_))
        ));
        assert!(matches!(
            "REQ-12a".parse::<DraftId>(),
            Err(IdentifierError::Syntax(_))
        ));
        assert!(matches!(
            "ABC-SI-FN-0001".parse::<DraftId>(),
            Err(IdentifierError::Syntax(_))
        ));
    }

    #[test_case("REQ-0007", true; "canonical")]
    #[test_case("REQ-7", false; "unpadded")]
    #[test_case("req-0007", false; "lowercase")]
    #[test_case("REQ-00007", false; "overpadded")]
    #[test_case("REQ-12345", true; "wide counter")]
    fn draft_canonical_form(value: &str, canonical: bool) {
        assert_eq!(DraftId::is_canonical(value), canonical);
    }

    #[test]
    fn global_parse_normalizes_width() {
        let id: GlobalId = "REQ-0042".parse().unwrap();
        assert_eq!(id.to_string(), "REQ-0000042");
        assert!("REQ-42".parse::<GlobalId>().is_err());
        assert!("REQ-12345678".parse::<GlobalId>().is_err());
    }

    #[test_case("ABC-SI-FN-0001.0001", true; "hierarchical")]
    #[test_case("SYS-GEN-PR-0014", true; "flat")]
    #[test_case("A1B-DE-AC-9999", true; "two character segment")]
    #[test_case("ABCD-SI-FN-0001", false; "long system code")]
    #[test_case("ABC-SI-FNX-0001", false; "long type code")]
    #[test_case("ABC-SI-FN-001", false; "short base")]
    #[test_case("ABC-SI-FN-0001.01", false; "short derived")]
    #[test_case("abc-si-fn-0001", false; "lowercase")]
    #[test_case("REQ-0001", false; "draft")]
    fn approved_pattern(value: &str, approved: bool) {
        assert_eq!(is_approved(value), approved);
    }

    #[test]
    fn approved_parse_extracts_parts() {
        let id: ApprovedId = "ABC-SI-FN-0003.0012".parse().unwrap();
        assert_eq!(id.system(), "ABC");
        assert_eq!(id.segment(), "SI");
        assert_eq!(id.type_code(), "FN");
        assert_eq!(id.base(), 3);
        assert_eq!(id.derived(), Some(12));
        assert_eq!(id.to_string(), "ABC-SI-FN-0003.0012");

        let flat: ApprovedId = "SYS-GEN-PR-0014".parse().unwrap();
        assert_eq!(flat.derived(), None);
        assert_eq!(flat.to_string(), "SYS-GEN-PR-0014");
    }

    #[test]
    fn approved_prefix_membership() {
        let prefix = Prefix {
            system: "ABC".to_string(),
            segment: "SI".to_string(),
            type_code: TypeCode::Functional,
        };
        let id = ApprovedId::new(&prefix, 2, Some(1));
        assert_eq!(id.to_string(), "ABC-SI-FN-0002.0001");
        assert!(id.has_prefix(&prefix));

        let other: ApprovedId = "ABC-GEN-FN-0002".parse().unwrap();
        assert!(!other.has_prefix(&prefix));
    }

    #[test_case("Functional", Some("FN"); "functional")]
    #[test_case("Fonksiyonel", Some("FN"); "functional localized")]
    #[test_case("Safety", Some("EM"); "safety")]
    #[test_case("Güvenlik", Some("GV"); "security localized")]
    #[test_case("Interface", Some("AR"); "interface")]
    #[test_case("Environmental", Some("CG"); "environmental")]
    #[test_case("Informational", Some("AC"); "informational")]
    #[test_case("Açıklama", Some("AC"); "informational localized")]
    #[test_case("Marketing", None; "unknown")]
    #[test_case("", None; "empty")]
    fn type_codes(value: &str, expected: Option<&str>) {
        assert_eq!(
            TypeCode::from_requirement_type(value).map(TypeCode::as_str),
            expected
        );
    }

    #[test_case("abc", 3, Some("ABC"); "uppercased")]
    #[test_case("a-b_c-d", 3, Some("ABC"); "strips punctuation")]
    #[test_case("radar", 3, Some("RAD"); "truncated")]
    #[test_case("--", 3, None; "nothing left")]
    fn code_normalization(value: &str, length: usize, expected: Option<&str>) {
        assert_eq!(normalize_code(value, length).as_deref(), expected);
    }

    #[test]
    fn error_display() {
        let error = IdentifierError::Syntax("nope".to_string());
        assert_eq!(error.to_string(), "invalid identifier format: nope");
    }
}
