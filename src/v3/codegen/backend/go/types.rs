use crate::v3::codegen::backend::go::{Context, COUNTRY, CURRENCY, EMAIL, UUID};
use crate::v3::codegen::ir::{
    AdditionalPolicy, EnumIr, Field, Optionality, PrimitiveKind, SchemaIr,
};
use crate::v3::codegen::sink::Sink;

use log::trace;
use std::fmt;

/// A Go type expression. Package-qualified names are resolved against the
/// sink when the type is built, so rendering is plain formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum GoType {
    Bool,
    Int,
    Float64,
    String,
    Bytes,
    Slice(Box<GoType>),
    Map(Box<GoType>),
    Interface,
    /// Declared in one of the generated artifacts, or an external type.
    Named(String),
    /// Verbatim type expression.
    Raw(String),
    Optional(String, Box<GoType>),
    Pointer(Box<GoType>),
}

impl fmt::Display for GoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use GoType::*;
        match self {
            Bool => write!(f, "bool"),
            Int => write!(f, "int"),
            Float64 => write!(f, "float64"),
            String => write!(f, "string"),
            Bytes => write!(f, "[]byte"),
            Slice(ty) => write!(f, "[]{ty}"),
            Map(ty) => write!(f, "map[string]{ty}"),
            Interface => write!(f, "interface{{}}"),
            Named(name) | Raw(name) => write!(f, "{name}"),
            Optional(optional, ty) => write!(f, "{optional}[{ty}]"),
            Pointer(ty) => write!(f, "*{ty}"),
        }
    }
}

/// How a raw string from a request is turned into a typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    /// Infallible expression over the raw string.
    Direct(String),
    /// Expression yielding `(value, error)`.
    Fallible(String),
    /// String enum: conversion then `Check()`.
    Enum(String),
    /// Integer enum: `strconv.Atoi`, conversion, then `Check()`.
    IntEnum(String),
    /// go-types format: conversion then `Validate()`.
    Validated(String),
}

/// Primitives backed by a go-types value with its own `Validate` method.
pub fn self_validating(kind: PrimitiveKind) -> bool {
    matches!(
        kind,
        PrimitiveKind::Email
            | PrimitiveKind::CountryA2
            | PrimitiveKind::CountryA3
            | PrimitiveKind::CurrencyCode
    )
}

impl Context<'_> {
    pub fn go_type(&self, sink: &mut Sink, schema: &SchemaIr) -> GoType {
        match schema {
            SchemaIr::Primitive(primitive) => self.primitive_type(sink, primitive.kind),
            SchemaIr::Array { element, .. } => GoType::Slice(Box::new(self.go_type(sink, element))),
            SchemaIr::Object(object) => match &object.additional {
                AdditionalPolicy::Typed(value) => GoType::Map(Box::new(self.go_type(sink, value))),
                AdditionalPolicy::GoMapType(expression) => GoType::Raw(expression.clone()),
                AdditionalPolicy::Any if object.fields.is_empty() => {
                    GoType::Map(Box::new(GoType::Interface))
                }
                _ => GoType::Interface,
            },
            // inline enums are always registered as components
            SchemaIr::Enum(enum_) => self.primitive_type(sink, enum_.base),
            SchemaIr::Named(name) => GoType::Named(self.component(sink, name)),
            SchemaIr::AnyOf(_) | SchemaIr::OneOf(_) | SchemaIr::AllOf(_) => GoType::Interface,
            SchemaIr::Custom(custom) => GoType::Named(match &custom.target.package {
                Some(package) => sink.qual(package, &custom.target.name),
                None => custom.target.name.clone(),
            }),
        }
    }

    pub fn primitive_type(&self, sink: &mut Sink, kind: PrimitiveKind) -> GoType {
        match kind {
            PrimitiveKind::Bool => GoType::Bool,
            PrimitiveKind::Int => GoType::Int,
            PrimitiveKind::Float => GoType::Float64,
            PrimitiveKind::String | PrimitiveKind::Time => GoType::String,
            PrimitiveKind::Bytes => GoType::Bytes,
            PrimitiveKind::Uuid => GoType::Named(sink.qual(UUID, "UUID")),
            PrimitiveKind::Email => GoType::Named(sink.qual(EMAIL, "Email")),
            PrimitiveKind::RawJson => GoType::Named(sink.qual("encoding/json", "RawMessage")),
            PrimitiveKind::CountryA2 => GoType::Named(sink.qual(COUNTRY, "Alpha2Code")),
            PrimitiveKind::CountryA3 => GoType::Named(sink.qual(COUNTRY, "Alpha3Code")),
            PrimitiveKind::CurrencyCode => GoType::Named(sink.qual(CURRENCY, "Code")),
        }
    }

    pub fn optional(&self, sink: &mut Sink, ty: GoType) -> GoType {
        GoType::Optional(self.component(sink, "Optional"), Box::new(ty))
    }

    /// Type of a DTO field, including its optional wrapper.
    pub fn field_type(&self, sink: &mut Sink, field: &Field) -> GoType {
        let ty = self.go_type(sink, &field.schema);
        match field.optionality {
            Optionality::Required | Optionality::Optional => ty,
            Optionality::OptionalNullable => self.optional(sink, ty),
            Optionality::Pointer => GoType::Pointer(Box::new(ty)),
        }
    }

    /// Type of a request parameter or response header field.
    pub fn scalar_field_type(&self, sink: &mut Sink, field: &Field) -> GoType {
        let ty = self.go_type(sink, &field.schema);
        if field.is_required() || matches!(self.resolve(&field.schema), SchemaIr::Array { .. }) {
            ty
        } else {
            self.optional(sink, ty)
        }
    }

    /// Conversion of a raw string into a value of `schema`.
    pub fn conversion(&self, sink: &mut Sink, schema: &SchemaIr, raw: &str) -> Conversion {
        let resolved = self.resolve(schema);
        trace!("conversion of {resolved:?}");
        match resolved {
            SchemaIr::Enum(EnumIr { base, .. }) => {
                let ty = self.go_type(sink, schema);
                if *base == PrimitiveKind::Int {
                    Conversion::IntEnum(ty.to_string())
                } else {
                    Conversion::Enum(format!("{ty}({raw})"))
                }
            }
            SchemaIr::Custom(custom) => match &custom.parse_fn {
                Some(parse) => {
                    let function = match &parse.package {
                        Some(package) => sink.qual(package, &parse.name),
                        None => parse.name.clone(),
                    };
                    Conversion::Fallible(format!("{function}({raw})"))
                }
                None => Conversion::Direct(format!("{}({raw})", self.go_type(sink, schema))),
            },
            SchemaIr::Primitive(primitive) => match primitive.kind {
                PrimitiveKind::String | PrimitiveKind::Time => Conversion::Direct(raw.to_string()),
                PrimitiveKind::Int => Conversion::Fallible(format!(
                    "{}({raw})",
                    sink.qual("strconv", "Atoi")
                )),
                PrimitiveKind::Float => Conversion::Fallible(format!(
                    "{}({raw}, 64)",
                    sink.qual("strconv", "ParseFloat")
                )),
                PrimitiveKind::Bool => Conversion::Fallible(format!(
                    "{}({raw})",
                    sink.qual("strconv", "ParseBool")
                )),
                PrimitiveKind::Uuid => {
                    Conversion::Fallible(format!("{}({raw})", sink.qual(UUID, "Parse")))
                }
                kind if self_validating(kind) => Conversion::Validated(format!(
                    "{}({raw})",
                    self.primitive_type(sink, kind)
                )),
                kind => Conversion::Direct(format!(
                    "{}({raw})",
                    self.primitive_type(sink, kind)
                )),
            },
            _ => Conversion::Direct(raw.to_string()),
        }
    }

    /// Expression rendering `value` of `schema` as a header string.
    pub fn format_scalar(&self, sink: &mut Sink, schema: &SchemaIr, value: &str) -> String {
        match self.resolve(schema) {
            SchemaIr::Enum(EnumIr { base, .. }) if *base == PrimitiveKind::Int => {
                format!("{}(int({value}))", sink.qual("strconv", "Itoa"))
            }
            SchemaIr::Enum(_) => format!("string({value})"),
            SchemaIr::Primitive(primitive) => match primitive.kind {
                PrimitiveKind::String | PrimitiveKind::Time => value.to_string(),
                PrimitiveKind::Int => format!("{}({value})", sink.qual("strconv", "Itoa")),
                PrimitiveKind::Float => format!(
                    "{}({value}, 'f', -1, 64)",
                    sink.qual("strconv", "FormatFloat")
                ),
                PrimitiveKind::Bool => format!("{}({value})", sink.qual("strconv", "FormatBool")),
                PrimitiveKind::Uuid => format!("{value}.String()"),
                _ => format!("string({value})"),
            },
            _ => format!("{}({value})", sink.qual("fmt", "Sprint")),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::v3::codegen::ir::{Program, QualifiedName, CustomType};
    use crate::v3::codegen::backend::go::IMPORT_ALIASES;
    use std::collections::BTreeMap;

    fn program() -> Program {
        Program {
            title: "t".into(),
            components: BTreeMap::new(),
            operations: vec![],
            security_schemes: vec![],
            spec_json: "{}".into(),
            config: Config::new("api", "out"),
        }
    }

    #[test]
    fn maps_schemas_to_go_types() {
        let program = program();
        let context = Context::new(&program, Some("github.com/acme/components"));
        let mut sink = Sink::new("\t", Some("api"), IMPORT_ALIASES);

        let uuids = SchemaIr::Array {
            element: Box::new(SchemaIr::primitive(PrimitiveKind::Uuid)),
            min_items: None,
            max_items: None,
        };
        assert_eq!(context.go_type(&mut sink, &uuids).to_string(), "[]uuid.UUID");
        assert_eq!(
            context.go_type(&mut sink, &SchemaIr::Named("Pet".into())).to_string(),
            "components.Pet"
        );
        assert_eq!(
            context.go_type(&mut sink, &SchemaIr::opaque()).to_string(),
            "interface{}"
        );
        let custom = SchemaIr::Custom(CustomType {
            target: QualifiedName::new(Some("github.com/shopspring/decimal"), "Decimal"),
            parse_fn: None,
            validate: false,
        });
        assert_eq!(context.go_type(&mut sink, &custom).to_string(), "decimal.Decimal");
        assert_eq!(
            context
                .optional(&mut sink, GoType::String)
                .to_string(),
            "components.Optional[string]"
        );
    }

    #[test]
    fn string_conversions() {
        let program = program();
        let context = Context::new(&program, None);
        let mut sink = Sink::new("\t", Some("api"), IMPORT_ALIASES);
        assert_eq!(
            context.conversion(&mut sink, &SchemaIr::primitive(PrimitiveKind::Int), "raw"),
            Conversion::Fallible("strconv.Atoi(raw)".into())
        );
        assert_eq!(
            context.conversion(&mut sink, &SchemaIr::primitive(PrimitiveKind::CountryA2), "raw"),
            Conversion::Validated("country.Alpha2Code(raw)".into())
        );
        assert_eq!(
            context.conversion(&mut sink, &SchemaIr::primitive(PrimitiveKind::Email), "raw"),
            Conversion::Validated("email.Email(raw)".into())
        );
        assert_eq!(
            context.conversion(&mut sink, &SchemaIr::primitive(PrimitiveKind::RawJson), "raw"),
            Conversion::Direct("json.RawMessage(raw)".into())
        );
        assert_eq!(
            context.format_scalar(&mut sink, &SchemaIr::primitive(PrimitiveKind::Float), "v"),
            "strconv.FormatFloat(v, 'f', -1, 64)"
        );
    }
}
