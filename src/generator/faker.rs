//! Faker-backed value generator
//!
//! Pattern names are matched case-insensitively with underscores ignored,
//! so `safeEmail`, `safe_email` and `SAFEEMAIL` are the same pattern.

use super::{GeneratorArgs, ValueGenerator};
use crate::domain::{Result, Value, VeilError};
use chrono::{TimeZone, Utc};
use fake::faker::address::raw::{
    BuildingNumber, CityName, CountryName, PostCode, StateName, StreetName,
};
use fake::faker::company::raw::{CompanyName, Profession};
use fake::faker::internet::raw::{
    DomainSuffix, FreeEmail, Password, SafeEmail, Username, IPv4, IPv6,
};
use fake::faker::lorem::raw::{Paragraph, Sentence, Word, Words};
use fake::faker::name::raw::{FirstName, LastName, Name, Title};
use fake::faker::phone_number::raw::PhoneNumber;
use fake::locales::{Data, EN, FR_FR, PT_BR, ZH_CN, ZH_TW};
use fake::Fake;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Locales the generator can produce text in
pub const SUPPORTED_LOCALES: [&str; 5] = ["en", "fr_fr", "pt_br", "zh_cn", "zh_tw"];

const DEFAULT_RANDOM_MAX: i64 = 2_147_483_647;

/// Value generator backed by the `fake` crate
///
/// # Examples
///
/// ```
/// use veil::generator::{FakerGenerator, GeneratorArgs, ValueGenerator};
///
/// let generator = FakerGenerator::seeded(7);
/// let email = generator.generate("safeEmail", &GeneratorArgs::new()).unwrap();
/// assert!(email.as_str().unwrap().contains('@'));
/// ```
#[derive(Debug)]
pub struct FakerGenerator {
    locale: String,
    rng: Mutex<StdRng>,
}

impl Default for FakerGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FakerGenerator {
    /// Generator seeded from OS entropy
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic generator
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            locale: "en".to_string(),
            rng: Mutex::new(rng),
        }
    }

    /// Switch the text locale
    pub fn with_locale(mut self, locale: &str) -> Result<Self> {
        let normalized = locale.to_lowercase().replace('-', "_");
        if !SUPPORTED_LOCALES.contains(&normalized.as_str()) {
            return Err(VeilError::Configuration(format!(
                "Unsupported locale '{}'. Must be one of: {}",
                locale,
                SUPPORTED_LOCALES.join(", ")
            )));
        }
        self.locale = normalized;
        Ok(self)
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }
}

impl ValueGenerator for FakerGenerator {
    fn generate(&self, pattern: &str, args: &GeneratorArgs) -> Result<Value> {
        let key = normalize(pattern);
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let localized = match self.locale.as_str() {
            "fr_fr" => localized(FR_FR, &key, args, &mut rng)?,
            "pt_br" => localized(PT_BR, &key, args, &mut rng)?,
            "zh_cn" => localized(ZH_CN, &key, args, &mut rng)?,
            "zh_tw" => localized(ZH_TW, &key, args, &mut rng)?,
            _ => localized(EN, &key, args, &mut rng)?,
        };
        if let Some(value) = localized {
            return Ok(value);
        }

        match neutral(&key, args, &mut rng)? {
            Some(value) => Ok(value),
            None => {
                debug!(pattern = %pattern, "Unknown generation pattern");
                Err(VeilError::UnknownPattern(pattern.to_string()))
            }
        }
    }
}

fn normalize(pattern: &str) -> String {
    pattern
        .chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Half-open range `[n, n + 1)` for fakers that take a count range
fn exactly(args: &GeneratorArgs, name: &str, default: usize) -> Result<std::ops::Range<usize>> {
    let n = match args.get_int(name)? {
        Some(n) if n < 0 => {
            return Err(VeilError::InvalidArgument(format!(
                "'{name}' must not be negative"
            )))
        }
        Some(n) => n as usize,
        None => default,
    };
    Ok(n..n + 1)
}

/// Text patterns that depend on the locale
fn localized<L: Data + Copy>(
    locale: L,
    key: &str,
    args: &GeneratorArgs,
    rng: &mut StdRng,
) -> Result<Option<Value>> {
    let text: String = match key {
        "name" => Name(locale).fake_with_rng(rng),
        "firstname" => FirstName(locale).fake_with_rng(rng),
        "lastname" => LastName(locale).fake_with_rng(rng),
        "title" => Title(locale).fake_with_rng(rng),
        "email" => FreeEmail(locale).fake_with_rng(rng),
        "safeemail" => SafeEmail(locale).fake_with_rng(rng),
        "username" => Username(locale).fake_with_rng(rng),
        "password" => {
            let min = args.get_int("minLength")?.unwrap_or(8).max(1) as usize;
            let max = args.get_int("maxLength")?.unwrap_or(20).max(min as i64) as usize;
            Password(locale, min..max + 1).fake_with_rng(rng)
        }
        "phonenumber" => PhoneNumber(locale).fake_with_rng(rng),
        "streetaddress" => {
            let number: String = BuildingNumber(locale).fake_with_rng(rng);
            let street: String = StreetName(locale).fake_with_rng(rng);
            format!("{number} {street}")
        }
        "streetname" => StreetName(locale).fake_with_rng(rng),
        "city" => CityName(locale).fake_with_rng(rng),
        "postcode" => PostCode(locale).fake_with_rng(rng),
        "state" => StateName(locale).fake_with_rng(rng),
        "country" => CountryName(locale).fake_with_rng(rng),
        "company" => CompanyName(locale).fake_with_rng(rng),
        "jobtitle" => Profession(locale).fake_with_rng(rng),
        "word" => Word(locale).fake_with_rng(rng),
        "words" => {
            let words: Vec<String> = Words(locale, exactly(args, "nb", 3)?).fake_with_rng(rng);
            return Ok(Some(Value::List(
                words.into_iter().map(Value::String).collect(),
            )));
        }
        "sentence" => Sentence(locale, exactly(args, "nbWords", 6)?).fake_with_rng(rng),
        "paragraph" => Paragraph(locale, exactly(args, "nbSentences", 3)?).fake_with_rng(rng),
        "text" => {
            let max_chars = args.get_int("maxNbChars")?.unwrap_or(200).max(5) as usize;
            let paragraph: String = Paragraph(locale, 3..6).fake_with_rng(rng);
            paragraph.chars().take(max_chars).collect()
        }
        "url" => {
            let word: String = Word(locale).fake_with_rng(rng);
            let suffix: String = DomainSuffix(locale).fake_with_rng(rng);
            format!("https://www.{}.{}/", word.to_lowercase(), suffix)
        }
        "ipv4" => IPv4(locale).fake_with_rng(rng),
        "ipv6" => IPv6(locale).fake_with_rng(rng),
        _ => return Ok(None),
    };
    Ok(Some(Value::String(text)))
}

/// Patterns that do not depend on the locale
fn neutral(key: &str, args: &GeneratorArgs, rng: &mut StdRng) -> Result<Option<Value>> {
    let value = match key {
        "uuid" => {
            let uuid = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
            Value::String(uuid.to_string())
        }
        "iban" => Value::String(iban(rng)),
        "creditcardnumber" => Value::String(credit_card_number(rng)),
        "randomnumber" => {
            let max = match args.get_int("digits")? {
                Some(digits) if !(1..=18).contains(&digits) => {
                    return Err(VeilError::InvalidArgument(
                        "'digits' must be between 1 and 18".to_string(),
                    ))
                }
                Some(digits) => 10_i64.pow(digits as u32) - 1,
                None => DEFAULT_RANDOM_MAX,
            };
            Value::Int(rng.gen_range(0..=max))
        }
        "numberbetween" => {
            let min = args.get_int("min")?.unwrap_or(0);
            let max = args.get_int("max")?.unwrap_or(DEFAULT_RANDOM_MAX);
            let (low, high) = if min <= max { (min, max) } else { (max, min) };
            Value::Int(rng.gen_range(low..=high))
        }
        "randomfloat" => {
            let min = args.get_float("min")?.unwrap_or(0.0);
            let max = args.get_float("max")?.unwrap_or(1000.0);
            if !min.is_finite() || !max.is_finite() || !(max - min).is_finite() {
                return Err(VeilError::InvalidArgument(format!(
                    "'min' and 'max' must be finite with a finite span, got {min} and {max}"
                )));
            }
            let decimals = args.get_int("nbMaxDecimals")?.unwrap_or(2).clamp(0, 10) as i32;
            let raw = if max > min { rng.gen_range(min..max) } else { min };
            let scale = 10_f64.powi(decimals);
            Value::Float((raw * scale).round() / scale)
        }
        "boolean" => {
            let chance = args.get_int("chanceOfGettingTrue")?.unwrap_or(50).clamp(0, 100);
            Value::Bool(rng.gen_range(0..100) < chance)
        }
        "randomelement" => {
            let elements = args.get_list("elements")?.ok_or_else(|| {
                VeilError::InvalidArgument("'elements' is required".to_string())
            })?;
            if elements.is_empty() {
                return Err(VeilError::InvalidArgument(
                    "'elements' must not be empty".to_string(),
                ));
            }
            elements[rng.gen_range(0..elements.len())].clone()
        }
        "date" | "time" | "datetime" => {
            let now = Utc::now().timestamp();
            let secs = rng.gen_range(0..=now);
            let moment = Utc.timestamp_opt(secs, 0).single().ok_or_else(|| {
                VeilError::InvalidArgument(format!("timestamp {secs} is out of range"))
            })?;
            match key {
                "date" => Value::String(moment.format("%Y-%m-%d").to_string()),
                "time" => Value::String(moment.format("%H:%M:%S").to_string()),
                _ => Value::Date(moment),
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn random_digits(rng: &mut StdRng, count: usize) -> String {
    (0..count)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// 16-digit Visa-style number with a valid Luhn check digit
fn credit_card_number(rng: &mut StdRng) -> String {
    let body = format!("4{}", random_digits(rng, 14));
    let sum: u32 = body
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    let check = (10 - sum % 10) % 10;
    format!("{body}{check}")
}

/// German-format IBAN with valid check digits
fn iban(rng: &mut StdRng) -> String {
    let bban = random_digits(rng, 18);
    // Country code letters as digits: D = 13, E = 14
    let rearranged = format!("{bban}131400");
    let remainder = rearranged
        .bytes()
        .fold(0u32, |acc, b| (acc * 10 + u32::from(b - b'0')) % 97);
    format!("DE{:02}{bban}", 98 - remainder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn generate(pattern: &str, args: &GeneratorArgs) -> Value {
        FakerGenerator::seeded(42).generate(pattern, args).unwrap()
    }

    #[test_case("name")]
    #[test_case("firstName")]
    #[test_case("last_name")]
    #[test_case("userName")]
    #[test_case("phoneNumber")]
    #[test_case("streetAddress")]
    #[test_case("city")]
    #[test_case("company")]
    #[test_case("jobTitle")]
    #[test_case("sentence")]
    #[test_case("url")]
    #[test_case("ipv4")]
    #[test_case("date")]
    fn test_string_patterns(pattern: &str) {
        let value = generate(pattern, &GeneratorArgs::new());
        assert!(!value.as_str().unwrap().is_empty(), "{pattern} was empty");
    }

    #[test]
    fn test_email_patterns() {
        assert!(generate("email", &GeneratorArgs::new())
            .as_str()
            .unwrap()
            .contains('@'));
        assert!(generate("SAFE_EMAIL", &GeneratorArgs::new())
            .as_str()
            .unwrap()
            .contains('@'));
    }

    #[test]
    fn test_seeded_generators_repeat() {
        let a = FakerGenerator::seeded(9);
        let b = FakerGenerator::seeded(9);
        for _ in 0..5 {
            assert_eq!(
                a.generate("name", &GeneratorArgs::new()).unwrap(),
                b.generate("name", &GeneratorArgs::new()).unwrap()
            );
        }
    }

    #[test]
    fn test_random_number_digits() {
        let mut args = GeneratorArgs::new();
        args.insert("digits", 3);
        for _ in 0..20 {
            match generate("randomNumber", &args) {
                Value::Int(n) => assert!((0..1000).contains(&n)),
                other => panic!("Expected int, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_number_between() {
        let mut args = GeneratorArgs::new();
        args.insert("min", 5).insert("max", 7);
        let generator = FakerGenerator::seeded(1);
        for _ in 0..20 {
            let value = generator.generate("numberBetween", &args).unwrap();
            assert!(matches!(value, Value::Int(5..=7)));
        }
    }

    #[test]
    fn test_words_returns_list() {
        let mut args = GeneratorArgs::new();
        args.insert("nb", 4);
        match generate("words", &args) {
            Value::List(words) => assert_eq!(words.len(), 4),
            other => panic!("Expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_random_element() {
        let mut args = GeneratorArgs::new();
        args.insert("elements", vec![Value::from("a"), Value::from("b")]);
        let value = generate("randomElement", &args);
        assert!(value == Value::from("a") || value == Value::from("b"));

        let err = FakerGenerator::seeded(1)
            .generate("randomElement", &GeneratorArgs::new())
            .unwrap_err();
        assert!(matches!(err, VeilError::InvalidArgument(_)));
    }

    #[test_case(0.0, f64::INFINITY ; "infinite max")]
    #[test_case(f64::NEG_INFINITY, 1.0 ; "infinite min")]
    #[test_case(f64::NAN, 1.0 ; "nan min")]
    #[test_case(-f64::MAX, f64::MAX ; "span overflows")]
    fn test_random_float_rejects_unbounded_range(min: f64, max: f64) {
        let mut args = GeneratorArgs::new();
        args.insert("min", min).insert("max", max);
        let err = FakerGenerator::seeded(1)
            .generate("randomFloat", &args)
            .unwrap_err();
        assert!(matches!(err, VeilError::InvalidArgument(_)));
    }

    #[test]
    fn test_random_float_in_range() {
        let mut args = GeneratorArgs::new();
        args.insert("min", 1.5).insert("max", 2.5);
        let generator = FakerGenerator::seeded(3);
        for _ in 0..20 {
            match generator.generate("randomFloat", &args).unwrap() {
                Value::Float(f) => assert!((1.5..=2.5).contains(&f)),
                other => panic!("Expected float, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_typed_patterns() {
        assert!(matches!(
            generate("dateTime", &GeneratorArgs::new()),
            Value::Date(_)
        ));
        assert!(matches!(
            generate("boolean", &GeneratorArgs::new()),
            Value::Bool(_)
        ));
        assert!(matches!(
            generate("randomFloat", &GeneratorArgs::new()),
            Value::Float(_)
        ));
    }

    #[test]
    fn test_uuid_format() {
        let value = generate("uuid", &GeneratorArgs::new());
        let parsed = uuid::Uuid::parse_str(value.as_str().unwrap()).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_credit_card_passes_luhn() {
        let mut rng = StdRng::seed_from_u64(3);
        let number = credit_card_number(&mut rng);
        assert_eq!(number.len(), 16);

        let sum: u32 = number
            .bytes()
            .rev()
            .enumerate()
            .map(|(i, b)| {
                let d = u32::from(b - b'0');
                if i % 2 == 1 {
                    let doubled = d * 2;
                    doubled / 10 + doubled % 10
                } else {
                    d
                }
            })
            .sum();
        assert_eq!(sum % 10, 0);
    }

    #[test]
    fn test_iban_check_digits() {
        let mut rng = StdRng::seed_from_u64(5);
        let value = iban(&mut rng);
        assert_eq!(value.len(), 22);
        assert!(value.starts_with("DE"));

        // Move the first four characters to the end and verify mod 97 == 1
        let moved = format!("{}{}", &value[4..], "1314");
        let digits = format!("{}{}", moved, &value[2..4]);
        let remainder = digits
            .bytes()
            .fold(0u32, |acc, b| (acc * 10 + u32::from(b - b'0')) % 97);
        assert_eq!(remainder, 1);
    }

    #[test]
    fn test_unknown_pattern() {
        let err = FakerGenerator::seeded(1)
            .generate("nope", &GeneratorArgs::new())
            .unwrap_err();
        assert!(matches!(err, VeilError::UnknownPattern(ref p) if p == "nope"));
    }

    #[test]
    fn test_locale_validation() {
        let generator = FakerGenerator::seeded(1).with_locale("fr-FR").unwrap();
        assert_eq!(generator.locale(), "fr_fr");
        assert!(FakerGenerator::new().with_locale("xx").is_err());
    }
}
