//! Attribute handling
//!
//! Two sides live here. Reading: an [`AttributeReader`] walks the
//! attributes of a start tag, flags names the element does not expect and
//! parses typed values, collecting findings in a scratch log. Reflection:
//! [`AttributeValue`] and [`FieldSpec`] give every element kind a typed,
//! name-addressed view of its fields.

use crate::diagnostics::{DiagnosticCode, DiagnosticLog};
use crate::element::base::ElementBase;
use crate::element::kinds::ElementKind;
use crate::names::{is_valid_sid, is_valid_xml_id};
use crate::namespaces::{is_sedml_namespace, XSI_NAMESPACE};
use crate::xml::node::qualify;
use crate::xml::stream::XmlToken;
use indexmap::IndexSet;
use std::fmt;

/// Base attributes every element accepts
pub const BASE_ATTRIBUTES: &[&str] = &["metaid", "id", "name"];

/// Names an element accepts on read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedAttributes {
    names: IndexSet<String>,
}

impl ExpectedAttributes {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// The base set: `metaid`, `id`, `name`
    pub fn base() -> Self {
        let mut expected = Self::new();
        for name in BASE_ATTRIBUTES {
            expected.add(*name);
        }
        expected
    }

    /// The base set chained with the fields of `kind`
    pub fn for_kind(kind: &ElementKind) -> Self {
        let mut expected = Self::base();
        for field in kind.fields() {
            expected.add(field.name);
        }
        expected
    }

    /// Add a name (`name` or `prefix:name`)
    pub fn add(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    /// Check if `name` is expected
    pub fn has_attribute(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Iterate over the names in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Type of a reflected field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// `xs:boolean`
    Bool,
    /// `xs:int`
    Int,
    /// `xs:nonNegativeInteger`
    Unsigned,
    /// `xs:double`
    Double,
    /// `xs:string` and friends
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueType::Bool => "a boolean",
            ValueType::Int => "an integer",
            ValueType::Unsigned => "a non-negative integer",
            ValueType::Double => "a double",
            ValueType::String => "a string",
        };
        write!(f, "{}", s)
    }
}

/// Name and type of a reflected field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// XML attribute name
    pub name: &'static str,
    /// Value type
    pub value_type: ValueType,
}

impl FieldSpec {
    /// Create a field spec
    pub const fn new(name: &'static str, value_type: ValueType) -> Self {
        Self { name, value_type }
    }
}

/// A typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i32),
    /// Unsigned integer
    Unsigned(u32),
    /// Double
    Double(f64),
    /// String
    String(String),
}

impl AttributeValue {
    /// Type of the value
    pub fn value_type(&self) -> ValueType {
        match self {
            AttributeValue::Bool(_) => ValueType::Bool,
            AttributeValue::Int(_) => ValueType::Int,
            AttributeValue::Unsigned(_) => ValueType::Unsigned,
            AttributeValue::Double(_) => ValueType::Double,
            AttributeValue::String(_) => ValueType::String,
        }
    }

    /// Convert to `target` where no information is lost
    ///
    /// Integers widen to doubles and convert between signed and unsigned
    /// when in range. Nothing converts to or from strings or booleans.
    pub fn coerce(self, target: ValueType) -> Option<AttributeValue> {
        use AttributeValue as V;
        if self.value_type() == target {
            return Some(self);
        }
        match (self, target) {
            (V::Int(i), ValueType::Double) => Some(V::Double(f64::from(i))),
            (V::Unsigned(u), ValueType::Double) => Some(V::Double(f64::from(u))),
            (V::Int(i), ValueType::Unsigned) => u32::try_from(i).ok().map(V::Unsigned),
            (V::Unsigned(u), ValueType::Int) => i32::try_from(u).ok().map(V::Int),
            _ => None,
        }
    }

    /// The boolean, if this is one
    pub fn into_bool(self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// The signed integer, if this is one
    pub fn into_int(self) -> Option<i32> {
        match self {
            AttributeValue::Int(i) => Some(i),
            _ => None,
        }
    }

    /// The unsigned integer, if this is one
    pub fn into_unsigned(self) -> Option<u32> {
        match self {
            AttributeValue::Unsigned(u) => Some(u),
            _ => None,
        }
    }

    /// The double, if this is one
    pub fn into_double(self) -> Option<f64> {
        match self {
            AttributeValue::Double(d) => Some(d),
            _ => None,
        }
    }

    /// The string, if this is one
    pub fn into_string(self) -> Option<String> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Lexical form used when writing XML
    pub fn to_xml_string(&self) -> String {
        match self {
            AttributeValue::Bool(b) => b.to_string(),
            AttributeValue::Int(i) => i.to_string(),
            AttributeValue::Unsigned(u) => u.to_string(),
            AttributeValue::Double(d) => format_double(*d),
            AttributeValue::String(s) => s.clone(),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        AttributeValue::Unsigned(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Double(v)
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

/// Types that can be extracted from an [`AttributeValue`]
pub trait FromAttributeValue: Sized {
    /// Convert, returning `None` on a type mismatch
    fn from_attribute_value(value: AttributeValue) -> Option<Self>;
}

impl FromAttributeValue for bool {
    fn from_attribute_value(value: AttributeValue) -> Option<Self> {
        value.into_bool()
    }
}

impl FromAttributeValue for i32 {
    fn from_attribute_value(value: AttributeValue) -> Option<Self> {
        value.coerce(ValueType::Int)?.into_int()
    }
}

impl FromAttributeValue for u32 {
    fn from_attribute_value(value: AttributeValue) -> Option<Self> {
        value.coerce(ValueType::Unsigned)?.into_unsigned()
    }
}

impl FromAttributeValue for f64 {
    fn from_attribute_value(value: AttributeValue) -> Option<Self> {
        value.coerce(ValueType::Double)?.into_double()
    }
}

impl FromAttributeValue for String {
    fn from_attribute_value(value: AttributeValue) -> Option<Self> {
        value.into_string()
    }
}

/// Write a double the way XML Schema spells it
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        value.to_string()
    }
}

/// Parse an `xs:double` lexical form
pub fn parse_double(text: &str) -> Option<f64> {
    match text.trim() {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        // Rust accepts spellings such as "inf" that XML does not
        t if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => None,
        t => t.parse().ok(),
    }
}

/// Parse an `xs:boolean` lexical form
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Reads the attributes of one start tag
///
/// Findings go to a private log positioned at the start tag; the driver
/// retags and merges it into the document log afterwards.
pub(crate) struct AttributeReader<'a> {
    token: &'a XmlToken,
    element_name: &'static str,
    level: u32,
    version: u32,
    log: DiagnosticLog,
}

impl<'a> AttributeReader<'a> {
    pub(crate) fn new(
        token: &'a XmlToken,
        element_name: &'static str,
        level: u32,
        version: u32,
    ) -> Self {
        Self {
            token,
            element_name,
            level,
            version,
            log: DiagnosticLog::new(),
        }
    }

    pub(crate) fn log(&mut self, code: DiagnosticCode, message: impl Into<String>) {
        self.log.log(
            code,
            self.level,
            self.version,
            message,
            self.token.line,
            self.token.column,
        );
    }

    pub(crate) fn into_log(self) -> DiagnosticLog {
        self.log
    }

    /// Raw value of `name`, unprefixed or in a SED-ML namespace
    pub(crate) fn raw(&self, name: &str) -> Option<&'a str> {
        self.token
            .attributes
            .iter()
            .find(|a| a.name == name && (a.prefix.is_empty() || is_sedml_namespace(&a.uri)))
            .map(|a| a.value.as_str())
    }

    /// Flag every attribute not in `expected`
    pub(crate) fn check_unknown(&mut self, expected: &ExpectedAttributes, is_root: bool) {
        let token = self.token;
        for attr in &token.attributes {
            if !attr.prefix.is_empty() {
                if expected.has_attribute(&qualify(&attr.prefix, &attr.name)) {
                    continue;
                }
                if is_root && !expected.has_attribute(&attr.name) && attr.uri == XSI_NAMESPACE {
                    continue;
                }
            }
            if !expected.has_attribute(&attr.name) {
                let message = format!(
                    "Attribute '{}' is not part of the definition of a SED-ML Level {} Version {} <{}> element.",
                    attr.qualified_name(),
                    self.level,
                    self.version,
                    self.element_name
                );
                self.log(DiagnosticCode::UnknownCoreAttribute, message);
            }
        }
    }

    fn log_empty(&mut self, name: &str) {
        let message = format!(
            "Attribute '{}' on an <{}> must not be an empty string.",
            name, self.element_name
        );
        self.log(DiagnosticCode::NotSchemaConformant, message);
    }

    fn log_mismatch(&mut self, name: &str, expected: ValueType, code: DiagnosticCode) {
        let message = format!(
            "Attribute '{}' from the <{}> element must be {}.",
            name, self.element_name, expected
        );
        self.log(code, message);
    }

    pub(crate) fn read_string(&mut self, name: &str) -> Option<String> {
        let value = self.raw(name)?;
        if value.is_empty() {
            self.log_empty(name);
            return None;
        }
        Some(value.to_string())
    }

    fn read_typed<T>(
        &mut self,
        name: &str,
        value_type: ValueType,
        mismatch: DiagnosticCode,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let value = self.raw(name)?;
        let parsed = parse(value);
        if parsed.is_none() {
            self.log_mismatch(name, value_type, mismatch);
        }
        parsed
    }

    pub(crate) fn read_bool(&mut self, name: &str) -> Option<bool> {
        self.read_typed(
            name,
            ValueType::Bool,
            DiagnosticCode::AttributeTypeMismatch,
            parse_bool,
        )
    }

    pub(crate) fn read_i32(&mut self, name: &str) -> Option<i32> {
        self.read_typed(
            name,
            ValueType::Int,
            DiagnosticCode::AttributeTypeMismatch,
            |s| s.trim().parse().ok(),
        )
    }

    pub(crate) fn read_f64(&mut self, name: &str) -> Option<f64> {
        self.read_typed(
            name,
            ValueType::Double,
            DiagnosticCode::AttributeTypeMismatch,
            parse_double,
        )
    }

    /// Read a required unsigned attribute with dedicated codes
    pub(crate) fn read_required_u32(
        &mut self,
        name: &str,
        mismatch: DiagnosticCode,
        missing: DiagnosticCode,
    ) -> Option<u32> {
        if self.raw(name).is_none() {
            let message = format!(
                "Attribute '{}' is missing from the <{}> element.",
                name, self.element_name
            );
            self.log(missing, message);
            return None;
        }
        self.read_typed(name, ValueType::Unsigned, mismatch, |s| {
            s.trim().parse().ok()
        })
    }
}

/// Read `metaid`, `id` and `name` into `base`
///
/// Invalid or empty values are reported and left unset. Attributes the
/// element may not carry at this level/version are reported and dropped.
pub(crate) fn read_base_attributes(
    base: &mut ElementBase,
    reader: &mut AttributeReader<'_>,
    level: u32,
    version: u32,
) {
    let element_name = reader.element_name;

    if let Some(value) = reader.raw("metaid") {
        if value.is_empty() {
            reader.log_empty("metaid");
        } else if !is_valid_xml_id(value) {
            let message = format!(
                "The metaid on the <{}> is '{}', which does not conform to the syntax.",
                element_name, value
            );
            reader.log(DiagnosticCode::InvalidMetaIdSyntax, message);
        } else {
            base.meta_id = Some(value.to_string());
        }
    }

    if let Some(value) = reader.raw("id") {
        if base.id_gated(level, version) {
            log_gated(reader, "id", version);
        } else if value.is_empty() {
            reader.log_empty("id");
        } else if !is_valid_sid(value) {
            let message = format!(
                "The id on the <{}> is '{}', which does not conform to the syntax.",
                element_name, value
            );
            reader.log(DiagnosticCode::IdSyntaxRule, message);
        } else {
            base.id = Some(value.to_string());
        }
    }

    if let Some(value) = reader.raw("name") {
        if base.name_gated(level, version) {
            log_gated(reader, "name", version);
        } else if value.is_empty() {
            reader.log_empty("name");
        } else {
            base.name = Some(value.to_string());
        }
    }
}

fn log_gated(reader: &mut AttributeReader<'_>, name: &str, version: u32) {
    let message = format!(
        "Attribute '{}' is not allowed on the <{}> element in SED-ML Level 1 Version {}.",
        name, reader.element_name, version
    );
    reader.log(DiagnosticCode::NotSchemaConformant, message);
}
