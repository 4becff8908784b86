//! Element kinds
//!
//! Every node in a document tree is an [`ElementKind`]: a closed set of
//! SED-ML element types, each carrying its own typed fields. The traversal
//! driver asks the kind for its element name, its field table and how to
//! read and write its attributes; it never needs to know the concrete type.

use crate::diagnostics::DiagnosticCode;
use crate::element::attributes::{AttributeReader, AttributeValue, FieldSpec, ValueType};
use crate::error::{OperationError, OperationResult};
use crate::xml::node::XmlNode;
use std::fmt;

/// Type code for each element kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindCode {
    /// `sedML`
    Document,
    /// Any `listOf*` container
    ListOf,
    /// `model`
    Model,
    /// `uniformTimeCourse`
    UniformTimeCourse,
    /// `dataGenerator`
    DataGenerator,
    /// `parameter`
    Parameter,
    /// `plot2D`
    Plot2D,
}

impl fmt::Display for KindCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KindCode::Document => "SedDocument",
            KindCode::ListOf => "SedListOf",
            KindCode::Model => "SedModel",
            KindCode::UniformTimeCourse => "SedUniformTimeCourse",
            KindCode::DataGenerator => "SedDataGenerator",
            KindCode::Parameter => "SedParameter",
            KindCode::Plot2D => "SedPlot2D",
        };
        write!(f, "{}", s)
    }
}

/// Which collection a `listOf*` element holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    /// `listOfModels`
    Models,
    /// `listOfSimulations`
    Simulations,
    /// `listOfDataGenerators`
    DataGenerators,
    /// `listOfParameters`
    Parameters,
    /// `listOfOutputs`
    Outputs,
}

impl ListKind {
    const ALL: [ListKind; 5] = [
        ListKind::Models,
        ListKind::Simulations,
        ListKind::DataGenerators,
        ListKind::Parameters,
        ListKind::Outputs,
    ];

    /// Element name of the container
    pub fn element_name(self) -> &'static str {
        match self {
            ListKind::Models => "listOfModels",
            ListKind::Simulations => "listOfSimulations",
            ListKind::DataGenerators => "listOfDataGenerators",
            ListKind::Parameters => "listOfParameters",
            ListKind::Outputs => "listOfOutputs",
        }
    }

    /// Look up a container by element name
    pub fn from_element_name(name: &str) -> Option<ListKind> {
        Self::ALL.into_iter().find(|k| k.element_name() == name)
    }

    /// Kind of the items the container holds
    pub fn item_kind(self) -> KindCode {
        match self {
            ListKind::Models => KindCode::Model,
            ListKind::Simulations => KindCode::UniformTimeCourse,
            ListKind::DataGenerators => KindCode::DataGenerator,
            ListKind::Parameters => KindCode::Parameter,
            ListKind::Outputs => KindCode::Plot2D,
        }
    }

    /// Create an empty item for `element_name`, if the container holds it
    pub fn create_item(self, element_name: &str) -> Option<ElementKind> {
        let item = ElementKind::for_code(self.item_kind())?;
        (item.element_name() == element_name).then_some(item)
    }
}

/// Fields of the `sedML` root element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentData {
    /// `level` attribute
    pub level: Option<u32>,
    /// `version` attribute
    pub version: Option<u32>,
}

/// Fields of a `model` element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelData {
    /// `source` attribute (URI of the model file)
    pub source: Option<String>,
    /// `language` attribute (URN of the model language)
    pub language: Option<String>,
}

/// Fields of a `uniformTimeCourse` element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformTimeCourseData {
    /// `initialTime` attribute
    pub initial_time: Option<f64>,
    /// `outputStartTime` attribute
    pub output_start_time: Option<f64>,
    /// `outputEndTime` attribute
    pub output_end_time: Option<f64>,
    /// `numberOfSteps` attribute
    pub number_of_steps: Option<i32>,
}

/// Fields of a `dataGenerator` element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataGeneratorData {
    math: Option<XmlNode>,
}

impl DataGeneratorData {
    /// The `math` subtree
    pub fn math(&self) -> Option<&XmlNode> {
        self.math.as_ref()
    }

    /// Set the `math` subtree; it must be a `math` element
    pub fn set_math(&mut self, math: &XmlNode) -> OperationResult {
        if math.name() != "math" {
            return Err(OperationError::InvalidObject);
        }
        self.math = Some(math.clone());
        Ok(())
    }

    /// Remove the `math` subtree
    pub fn unset_math(&mut self) {
        self.math = None;
    }

    /// Check if `math` is set
    pub fn is_set_math(&self) -> bool {
        self.math.is_some()
    }

    pub(crate) fn store_math(&mut self, math: XmlNode) {
        self.math = Some(math);
    }
}

/// Fields of a `parameter` element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterData {
    /// `value` attribute
    pub value: Option<f64>,
}

/// Fields of a `plot2D` element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plot2DData {
    /// `legend` attribute
    pub legend: Option<bool>,
    /// `height` attribute
    pub height: Option<f64>,
    /// `width` attribute
    pub width: Option<f64>,
}

/// Kind-specific payload of an element node
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// The `sedML` root
    Document(DocumentData),
    /// A `listOf*` container
    ListOf(ListKind),
    /// A `model`
    Model(ModelData),
    /// A `uniformTimeCourse` simulation
    UniformTimeCourse(UniformTimeCourseData),
    /// A `dataGenerator`
    DataGenerator(DataGeneratorData),
    /// A `parameter`
    Parameter(ParameterData),
    /// A `plot2D` output
    Plot2D(Plot2DData),
}

const DOCUMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("level", ValueType::Unsigned),
    FieldSpec::new("version", ValueType::Unsigned),
];

const MODEL_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("source", ValueType::String),
    FieldSpec::new("language", ValueType::String),
];

const UNIFORM_TIME_COURSE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("initialTime", ValueType::Double),
    FieldSpec::new("outputStartTime", ValueType::Double),
    FieldSpec::new("outputEndTime", ValueType::Double),
    FieldSpec::new("numberOfSteps", ValueType::Int),
];

const PARAMETER_FIELDS: &[FieldSpec] = &[FieldSpec::new("value", ValueType::Double)];

const PLOT2D_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("legend", ValueType::Bool),
    FieldSpec::new("height", ValueType::Double),
    FieldSpec::new("width", ValueType::Double),
];

impl ElementKind {
    /// An empty payload for `code`; `None` for lists, which need a [`ListKind`]
    pub fn for_code(code: KindCode) -> Option<ElementKind> {
        Some(match code {
            KindCode::Document => ElementKind::Document(DocumentData::default()),
            KindCode::ListOf => return None,
            KindCode::Model => ElementKind::Model(ModelData::default()),
            KindCode::UniformTimeCourse => {
                ElementKind::UniformTimeCourse(UniformTimeCourseData::default())
            }
            KindCode::DataGenerator => ElementKind::DataGenerator(DataGeneratorData::default()),
            KindCode::Parameter => ElementKind::Parameter(ParameterData::default()),
            KindCode::Plot2D => ElementKind::Plot2D(Plot2DData::default()),
        })
    }

    /// Type code
    pub fn code(&self) -> KindCode {
        match self {
            ElementKind::Document(_) => KindCode::Document,
            ElementKind::ListOf(_) => KindCode::ListOf,
            ElementKind::Model(_) => KindCode::Model,
            ElementKind::UniformTimeCourse(_) => KindCode::UniformTimeCourse,
            ElementKind::DataGenerator(_) => KindCode::DataGenerator,
            ElementKind::Parameter(_) => KindCode::Parameter,
            ElementKind::Plot2D(_) => KindCode::Plot2D,
        }
    }

    /// XML element name
    pub fn element_name(&self) -> &'static str {
        match self {
            ElementKind::Document(_) => "sedML",
            ElementKind::ListOf(kind) => kind.element_name(),
            ElementKind::Model(_) => "model",
            ElementKind::UniformTimeCourse(_) => "uniformTimeCourse",
            ElementKind::DataGenerator(_) => "dataGenerator",
            ElementKind::Parameter(_) => "parameter",
            ElementKind::Plot2D(_) => "plot2D",
        }
    }

    /// Whether `id` is visible before Level 1 Version 4
    pub fn id_allowed_pre_v4(&self) -> bool {
        matches!(
            self,
            ElementKind::Model(_)
                | ElementKind::UniformTimeCourse(_)
                | ElementKind::DataGenerator(_)
                | ElementKind::Parameter(_)
                | ElementKind::Plot2D(_)
        )
    }

    /// Whether `name` is visible before Level 1 Version 4
    pub fn name_allowed_pre_v4(&self) -> bool {
        self.id_allowed_pre_v4()
    }

    /// Typed fields exposed by this kind
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            ElementKind::Document(_) => DOCUMENT_FIELDS,
            ElementKind::ListOf(_) | ElementKind::DataGenerator(_) => &[],
            ElementKind::Model(_) => MODEL_FIELDS,
            ElementKind::UniformTimeCourse(_) => UNIFORM_TIME_COURSE_FIELDS,
            ElementKind::Parameter(_) => PARAMETER_FIELDS,
            ElementKind::Plot2D(_) => PLOT2D_FIELDS,
        }
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Current value of a field; `Ok(None)` when unset
    pub fn get_field(&self, name: &str) -> OperationResult<Option<AttributeValue>> {
        use AttributeValue as V;
        let value = match (self, name) {
            (ElementKind::Document(d), "level") => d.level.map(V::Unsigned),
            (ElementKind::Document(d), "version") => d.version.map(V::Unsigned),
            (ElementKind::Model(m), "source") => m.source.clone().map(V::String),
            (ElementKind::Model(m), "language") => m.language.clone().map(V::String),
            (ElementKind::UniformTimeCourse(u), "initialTime") => u.initial_time.map(V::Double),
            (ElementKind::UniformTimeCourse(u), "outputStartTime") => {
                u.output_start_time.map(V::Double)
            }
            (ElementKind::UniformTimeCourse(u), "outputEndTime") => {
                u.output_end_time.map(V::Double)
            }
            (ElementKind::UniformTimeCourse(u), "numberOfSteps") => {
                u.number_of_steps.map(V::Int)
            }
            (ElementKind::Parameter(p), "value") => p.value.map(V::Double),
            (ElementKind::Plot2D(p), "legend") => p.legend.map(V::Bool),
            (ElementKind::Plot2D(p), "height") => p.height.map(V::Double),
            (ElementKind::Plot2D(p), "width") => p.width.map(V::Double),
            _ => return Err(OperationError::AttributeNotRecognized),
        };
        Ok(value)
    }

    /// Set a field; `value` must have the field's type
    pub fn set_field(&mut self, name: &str, value: AttributeValue) -> OperationResult {
        let spec = self
            .field(name)
            .ok_or(OperationError::AttributeNotRecognized)?;
        let value = value
            .coerce(spec.value_type)
            .ok_or(OperationError::InvalidAttributeValue)?;
        self.store_field(name, Some(value))
    }

    /// Clear a field
    pub fn unset_field(&mut self, name: &str) -> OperationResult {
        self.field(name)
            .ok_or(OperationError::AttributeNotRecognized)?;
        self.store_field(name, None)
    }

    fn store_field(&mut self, name: &str, value: Option<AttributeValue>) -> OperationResult {
        use AttributeValue as V;
        match (self, name) {
            (ElementKind::Document(d), "level") => d.level = value.and_then(V::into_unsigned),
            (ElementKind::Document(d), "version") => d.version = value.and_then(V::into_unsigned),
            (ElementKind::Model(m), "source") => m.source = value.and_then(V::into_string),
            (ElementKind::Model(m), "language") => m.language = value.and_then(V::into_string),
            (ElementKind::UniformTimeCourse(u), "initialTime") => {
                u.initial_time = value.and_then(V::into_double)
            }
            (ElementKind::UniformTimeCourse(u), "outputStartTime") => {
                u.output_start_time = value.and_then(V::into_double)
            }
            (ElementKind::UniformTimeCourse(u), "outputEndTime") => {
                u.output_end_time = value.and_then(V::into_double)
            }
            (ElementKind::UniformTimeCourse(u), "numberOfSteps") => {
                u.number_of_steps = value.and_then(V::into_int)
            }
            (ElementKind::Parameter(p), "value") => p.value = value.and_then(V::into_double),
            (ElementKind::Plot2D(p), "legend") => p.legend = value.and_then(V::into_bool),
            (ElementKind::Plot2D(p), "height") => p.height = value.and_then(V::into_double),
            (ElementKind::Plot2D(p), "width") => p.width = value.and_then(V::into_double),
            _ => return Err(OperationError::AttributeNotRecognized),
        }
        Ok(())
    }

    /// Read the kind's own attributes
    pub(crate) fn read_attributes(&mut self, reader: &mut AttributeReader<'_>) {
        match self {
            ElementKind::Document(d) => {
                d.level = reader.read_required_u32(
                    "level",
                    DiagnosticCode::DocumentLevelMustBeNonNegativeInteger,
                    DiagnosticCode::DocumentAllowedAttributes,
                );
                d.version = reader.read_required_u32(
                    "version",
                    DiagnosticCode::DocumentVersionMustBeNonNegativeInteger,
                    DiagnosticCode::DocumentAllowedAttributes,
                );
            }
            ElementKind::ListOf(_) => {}
            ElementKind::Model(m) => {
                m.source = reader.read_string("source");
                m.language = reader.read_string("language");
            }
            ElementKind::UniformTimeCourse(u) => {
                u.initial_time = reader.read_f64("initialTime");
                u.output_start_time = reader.read_f64("outputStartTime");
                u.output_end_time = reader.read_f64("outputEndTime");
                u.number_of_steps = reader.read_i32("numberOfSteps");
            }
            ElementKind::DataGenerator(_) => {}
            ElementKind::Parameter(p) => {
                p.value = reader.read_f64("value");
            }
            ElementKind::Plot2D(p) => {
                p.legend = reader.read_bool("legend");
                p.height = reader.read_f64("height");
                p.width = reader.read_f64("width");
            }
        }
    }

    /// Set fields as `(name, value)` pairs in field-table order
    pub(crate) fn written_attributes(&self) -> Vec<(&'static str, String)> {
        self.fields()
            .iter()
            .filter_map(|spec| match self.get_field(spec.name) {
                Ok(Some(value)) => Some((spec.name, value.to_xml_string())),
                _ => None,
            })
            .collect()
    }

    /// Code that unknown-attribute findings on this kind are refined into
    pub(crate) fn unknown_attribute_code(&self) -> Option<DiagnosticCode> {
        match self {
            ElementKind::Document(_) => Some(DiagnosticCode::DocumentAllowedAttributes),
            ElementKind::Model(_) => Some(DiagnosticCode::ModelAllowedAttributes),
            _ => None,
        }
    }

    /// Code for an unrecognised child element of this kind
    pub(crate) fn unknown_element_code(&self) -> DiagnosticCode {
        match self {
            ElementKind::Document(_) => DiagnosticCode::DocumentAllowedElements,
            _ => DiagnosticCode::UnrecognizedElement,
        }
    }

    /// Containers this kind may own
    pub fn child_lists(&self) -> &'static [ListKind] {
        match self {
            ElementKind::Document(_) => &[
                ListKind::Models,
                ListKind::Simulations,
                ListKind::DataGenerators,
                ListKind::Outputs,
            ],
            ElementKind::DataGenerator(_) => &[ListKind::Parameters],
            _ => &[],
        }
    }

    /// Whether the required attributes are present
    pub fn has_required_attributes(&self, id_set: bool) -> bool {
        match self {
            ElementKind::Document(d) => d.level.is_some() && d.version.is_some(),
            ElementKind::ListOf(_) => true,
            ElementKind::Model(m) => id_set && m.source.is_some(),
            ElementKind::UniformTimeCourse(u) => {
                id_set
                    && u.initial_time.is_some()
                    && u.output_start_time.is_some()
                    && u.output_end_time.is_some()
                    && u.number_of_steps.is_some()
            }
            ElementKind::DataGenerator(_) | ElementKind::Plot2D(_) => id_set,
            ElementKind::Parameter(p) => id_set && p.value.is_some(),
        }
    }

    /// Whether the required child elements are present
    pub fn has_required_elements(&self) -> bool {
        match self {
            ElementKind::DataGenerator(d) => d.is_set_math(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_kinds() {
        assert_eq!(
            ListKind::from_element_name("listOfModels"),
            Some(ListKind::Models)
        );
        assert_eq!(ListKind::from_element_name("listOfTasks"), None);
        assert!(ListKind::Models.create_item("model").is_some());
        assert!(ListKind::Models.create_item("parameter").is_none());
        assert_eq!(ListKind::Outputs.item_kind(), KindCode::Plot2D);
    }

    #[test]
    fn test_field_access() {
        let mut kind = ElementKind::for_code(KindCode::UniformTimeCourse).unwrap();
        assert_eq!(kind.get_field("numberOfSteps"), Ok(None));

        kind.set_field("numberOfSteps", AttributeValue::Int(100)).unwrap();
        kind.set_field("outputEndTime", AttributeValue::Int(10)).unwrap();
        assert_eq!(
            kind.get_field("numberOfSteps"),
            Ok(Some(AttributeValue::Int(100)))
        );
        // integers widen to doubles
        assert_eq!(
            kind.get_field("outputEndTime"),
            Ok(Some(AttributeValue::Double(10.0)))
        );

        assert_eq!(
            kind.set_field("numberOfSteps", AttributeValue::String("x".into())),
            Err(OperationError::InvalidAttributeValue)
        );
        assert_eq!(
            kind.get_field("source"),
            Err(OperationError::AttributeNotRecognized)
        );

        kind.unset_field("numberOfSteps").unwrap();
        assert_eq!(kind.get_field("numberOfSteps"), Ok(None));
    }

    #[test]
    fn test_written_attributes_order() {
        let mut kind = ElementKind::for_code(KindCode::Plot2D).unwrap();
        kind.set_field("width", AttributeValue::Double(2.5)).unwrap();
        kind.set_field("legend", AttributeValue::Bool(true)).unwrap();
        assert_eq!(
            kind.written_attributes(),
            vec![("legend", "true".to_string()), ("width", "2.5".to_string())]
        );
    }

    #[test]
    fn test_set_math_requires_math_element() {
        let mut data = DataGeneratorData::default();
        let not_math = XmlNode::parse("<apply/>", None).unwrap();
        assert_eq!(data.set_math(&not_math), Err(OperationError::InvalidObject));
        let math = XmlNode::parse(
            "<math xmlns=\"http://www.w3.org/1998/Math/MathML\"><ci>x</ci></math>",
            None,
        )
        .unwrap();
        assert!(data.set_math(&math).is_ok());
        assert!(data.is_set_math());
    }

    #[test]
    fn test_required_attributes() {
        let mut kind = ElementKind::for_code(KindCode::Model).unwrap();
        assert!(!kind.has_required_attributes(true));
        kind.set_field("source", AttributeValue::from("model.xml")).unwrap();
        assert!(kind.has_required_attributes(true));
        assert!(!kind.has_required_attributes(false));
    }
}
