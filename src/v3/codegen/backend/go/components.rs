use crate::error::Result;
use crate::name::exported;
use crate::v3::codegen::backend::go::types::self_validating;
use crate::v3::codegen::backend::go::{
    comment, format_var_name, quote, quote_pattern, runtime, Context, GoType, VALIDATION,
};
use crate::v3::codegen::ir::{
    AdditionalPolicy, Bound, Component, EnumIr, EnumLiteral, Field, ObjectIr, Optionality,
    PrimitiveKind, QualifiedName, SchemaIr,
};
use crate::v3::codegen::sink::Sink;

use log::trace;

/// A single ozzo-validation rule attached to a field.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Rule {
    Required,
    RuneLength(u64, u64),
    Length(u64, u64),
    Min(String, bool),
    Max(String, bool),
    /// Checked against the field's pattern variable.
    Match,
}

impl Rule {
    pub(super) fn render(&self, validation: &str, pattern: Option<&str>) -> String {
        let exclusive = |rule: String, exclusive: &bool| {
            if *exclusive {
                format!("{rule}.Exclusive()")
            } else {
                rule
            }
        };
        match self {
            Rule::Required => format!("{validation}.Required"),
            Rule::RuneLength(min, max) => format!("{validation}.RuneLength({min}, {max})"),
            Rule::Length(min, max) => format!("{validation}.Length({min}, {max})"),
            Rule::Min(value, exclusive_) => exclusive(format!("{validation}.Min({value})"), exclusive_),
            Rule::Max(value, exclusive_) => exclusive(format!("{validation}.Max({value})"), exclusive_),
            Rule::Match => format!("{validation}.Match({})", pattern.unwrap_or_default()),
        }
    }
}

/// Go literal for a numeric bound. Integer fields get integer literals; a
/// fractional bound is tightened to the nearest integer inside the range.
fn bound_literal(bound: Bound, integer: bool, lower: bool) -> (String, bool) {
    if !integer {
        return (format!("{:?}", bound.value), bound.exclusive);
    }
    if bound.value.fract() == 0.0 {
        return (format!("{}", bound.value as i64), bound.exclusive);
    }
    let rounded = if lower {
        bound.value.ceil()
    } else {
        bound.value.floor()
    };
    (format!("{}", rounded as i64), false)
}

/// Required fields, including pointer ones, are checked for missing and null.
fn presence_checked(object: &ObjectIr, field: &Field) -> bool {
    field.is_required() || object.required.contains(&field.json_name)
}

/// Lowercase first letter of a type name.
pub(super) fn receiver(name: &str) -> String {
    name.chars()
        .next()
        .map(|c| c.to_ascii_lowercase().to_string())
        .filter(|c| c.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or_else(|| "v".into())
}

impl Context<'_> {
    pub(super) fn rules(&self, field: &Field) -> Vec<Rule> {
        if field.skip_validation {
            return vec![];
        }
        let constraints = &field.constraints;
        let mut rules = vec![];
        match self.resolve(&field.schema) {
            SchemaIr::Primitive(primitive) if primitive.kind.is_textual() => {
                if field.is_required() && constraints.min_length.unwrap_or_default() > 0 {
                    rules.push(Rule::Required);
                }
                if constraints.min_length.is_some() || constraints.max_length.is_some() {
                    rules.push(Rule::RuneLength(
                        constraints.min_length.unwrap_or_default(),
                        constraints.max_length.unwrap_or_default(),
                    ));
                }
                if constraints.pattern.is_some() {
                    rules.push(Rule::Match);
                }
            }
            SchemaIr::Primitive(primitive) if primitive.kind.is_numeric() => {
                let integer = primitive.kind == PrimitiveKind::Int;
                if let Some(bound) = constraints.minimum {
                    let (value, exclusive) = bound_literal(bound, integer, true);
                    rules.push(Rule::Min(value, exclusive));
                }
                if let Some(bound) = constraints.maximum {
                    let (value, exclusive) = bound_literal(bound, integer, false);
                    rules.push(Rule::Max(value, exclusive));
                }
            }
            SchemaIr::Array {
                min_items,
                max_items,
                ..
            } => {
                if field.is_required() && min_items.unwrap_or_default() > 0 {
                    rules.push(Rule::Required);
                }
                if min_items.is_some() || max_items.is_some() {
                    rules.push(Rule::Length(
                        min_items.unwrap_or_default(),
                        max_items.unwrap_or_default(),
                    ));
                }
            }
            _ => {}
        }
        rules
    }

    /// Values of the schema carry their own `Validate` method.
    pub(super) fn nested_validates(&self, schema: &SchemaIr) -> bool {
        if self.validates(schema) {
            return true;
        }
        match self.resolve(schema) {
            SchemaIr::Custom(custom) => custom.validate,
            SchemaIr::Primitive(primitive) => self_validating(primitive.kind),
            SchemaIr::Array { element, .. } => self.nested_validates(element),
            _ => false,
        }
    }

    /// Absent owned values hold the empty string, which a go-types format rejects.
    fn skips_when_empty(&self, field: &Field) -> bool {
        field.optionality == Optionality::Optional
            && matches!(
                self.resolve(&field.schema),
                SchemaIr::Primitive(primitive) if self_validating(primitive.kind)
            )
    }

    pub(super) fn field_validates(&self, field: &Field) -> bool {
        !field.skip_validation
            && (!self.rules(field).is_empty() || self.nested_validates(&field.schema))
    }

    pub(super) fn component_validates(&self, component: &Component) -> bool {
        if component.skip_validation {
            return false;
        }
        match &component.schema {
            SchemaIr::Object(object) => object.fields.values().any(|field| self.field_validates(field)),
            SchemaIr::Custom(custom) => custom.validate,
            schema @ (SchemaIr::Named(_) | SchemaIr::Array { .. }) => self.validates(schema),
            _ => false,
        }
    }

    pub(super) fn emit_components(&self, sink: &mut Sink) -> Result<()> {
        runtime::components(sink)?;
        for component in self.program.components.values() {
            sink.blank();
            self.emit_component(sink, component)?;
        }
        Ok(())
    }

    fn emit_component(&self, sink: &mut Sink, component: &Component) -> Result<()> {
        let name = component.name.as_str();
        trace!("emitting component `{name}`");
        sink.declare(name, &component.origin.to_string())?;
        comment(sink, name, component.description.as_deref());

        match &component.schema {
            SchemaIr::Object(object) if !object.fields.is_empty() => {
                self.emit_struct(sink, component, object)
            }
            SchemaIr::Object(object) if object.additional == AdditionalPolicy::Forbidden => {
                sink.line(format!("type {name} struct{{}}"));
                Ok(())
            }
            SchemaIr::Enum(enum_) => self.emit_enum(sink, name, enum_),
            schema => {
                let ty = self.go_type(sink, schema);
                sink.line(format!("type {name} = {ty}"));
                Ok(())
            }
        }
    }

    fn emit_struct(&self, sink: &mut Sink, component: &Component, object: &ObjectIr) -> Result<()> {
        let name = component.name.as_str();

        let mut rows: Vec<(Option<&str>, Vec<String>)> = vec![];
        for field in object.fields.values() {
            let omitempty = if field.omitempty { ",omitempty" } else { "" };
            // encoding/json ignores omitempty on structs
            let omit_json = match field.optionality {
                Optionality::OptionalNullable if field.omitempty => ",omitzero",
                _ => omitempty,
            };
            let json = &field.json_name;
            rows.push((
                field.description.as_deref(),
                vec![
                    exported(json),
                    self.field_type(sink, field).to_string(),
                    format!("`json:\"{json}{omit_json}\" xml:\"{json}{omitempty}\"`"),
                ],
            ));
        }
        sink.block(format!("type {name} struct"), |s| {
            let mut pending = vec![];
            for (description, row) in rows {
                if description.is_some() {
                    s.rows(&pending);
                    pending.clear();
                    comment(s, &row[0], description);
                }
                pending.push(row);
            }
            s.rows(&pending);
        });

        let validated = !component.skip_validation && self.has_validator(name);
        let mut patterns = vec![];
        for field in object.fields.values() {
            let ident = exported(&field.json_name);
            if let Some(regex) = &field.regex {
                patterns.push((format_var_name(&format!("{name}{ident}Regex")), regex.as_str()));
            }
            if let Some(pattern) = &field.constraints.pattern {
                if validated && self.rules(field).contains(&Rule::Match) {
                    patterns.push((format_var_name(&format!("{name}{ident}Pattern")), pattern.as_str()));
                }
            }
        }
        if !patterns.is_empty() {
            let compile = sink.qual("regexp", "MustCompile");
            let mut rows = vec![];
            for (var, pattern) in &patterns {
                sink.declare(var, &format!("pattern of {name}"))?;
                rows.push(vec![
                    var.clone(),
                    "=".to_string(),
                    format!("{compile}({})", quote_pattern(pattern)),
                ]);
            }
            sink.blank();
            sink.block_with("var (", ")", |s| s.rows(&rows));
        }

        if self.needs_decoder(object) {
            sink.blank();
            self.emit_decoder(sink, name, object);
        }
        if validated {
            sink.blank();
            self.emit_validator(sink, name, object);
        }
        Ok(())
    }

    /// Parse function of a custom type, looked up through aliases.
    pub(super) fn parse_fn<'s>(&'s self, field: &'s Field) -> Option<&'s QualifiedName> {
        match self.resolve(&field.schema) {
            SchemaIr::Custom(custom) => custom.parse_fn.as_ref(),
            _ => None,
        }
    }

    fn needs_decoder(&self, object: &ObjectIr) -> bool {
        object.fields.values().any(|field| {
            presence_checked(object, field)
                || field.regex.is_some()
                || field.trimmable
                || self.parse_fn(field).is_some()
        })
    }

    fn shadow_type(&self, sink: &mut Sink, field: &Field, required: bool) -> GoType {
        let base = if self.parse_fn(field).is_some() {
            GoType::String
        } else {
            self.go_type(sink, &field.schema)
        };
        match field.optionality {
            Optionality::Required | Optionality::OptionalNullable => self.optional(sink, base),
            Optionality::Pointer if required => self.optional(sink, base),
            Optionality::Optional => base,
            Optionality::Pointer => GoType::Pointer(Box::new(base)),
        }
    }

    /// `UnmarshalJSON` decoding into a shadow struct, then enforcing
    /// presence, trimming, patterns and string parsing field by field.
    fn emit_decoder(&self, sink: &mut Sink, name: &str, object: &ObjectIr) {
        let recv = receiver(name);
        let unmarshal = sink.qual("encoding/json", "Unmarshal");
        let errorf = sink.qual("fmt", "Errorf");
        let trim = if object.fields.values().any(|field| field.trimmable) {
            sink.qual("strings", "TrimSpace")
        } else {
            String::new()
        };
        let new_optional = self.component(sink, "NewOptional");

        let mut shadow_rows = vec![];
        for field in object.fields.values() {
            shadow_rows.push(vec![
                exported(&field.json_name),
                self.shadow_type(sink, field, presence_checked(object, field)).to_string(),
                format!("`json:\"{}\"`", field.json_name),
            ]);
        }
        let missing = self.component(sink, "RequiredFieldMissingError");
        let null = self.component(sink, "RequiredFieldNullError");
        let mismatch = self.component(sink, "PatternMismatchError");

        let mut fields = vec![];
        for field in object.fields.values() {
            let ident = exported(&field.json_name);
            let parse = self.parse_fn(field).map(|parse| match &parse.package {
                Some(package) => sink.qual(package, &parse.name),
                None => parse.name.clone(),
            });
            let optional = match field.optionality {
                Optionality::OptionalNullable => {
                    let ty = self.go_type(sink, &field.schema);
                    Some(self.optional(sink, ty).to_string())
                }
                _ => None,
            };
            fields.push((field, ident, parse, optional, presence_checked(object, field)));
        }

        sink.block(format!("func ({recv} *{name}) UnmarshalJSON(data []byte) error"), |s| {
            s.block("if string(data) == \"null\"", |s| s.line("return nil"));
            s.block("var shadow struct", |s| s.rows(&shadow_rows));
            s.block(format!("if err := {unmarshal}(data, &shadow); err != nil"), |s| {
                s.line("return err")
            });

            for (field, ident, parse, optional, required) in &fields {
                let json = quote(&field.json_name);
                let shadow = format!("shadow.{ident}");
                if *required {
                    s.block(format!("if {shadow}.IsNull()"), |s| {
                        s.line(format!("return {null}{{Field: {json}}}"))
                    });
                    s.block(format!("if !{shadow}.IsSet()"), |s| {
                        s.line(format!("return {missing}{{Field: {json}}}"))
                    });
                }

                let transformed = field.trimmable || field.regex.is_some() || parse.is_some();
                if !transformed {
                    match field.optionality {
                        Optionality::Required => s.line(format!("{recv}.{ident} = {shadow}.Get()")),
                        Optionality::Pointer if *required => {
                            let var = format_var_name(&format!("{ident}Value"));
                            s.line(format!("{var} := {shadow}.Get()"));
                            s.line(format!("{recv}.{ident} = &{var}"));
                        }
                        _ => s.line(format!("{recv}.{ident} = {shadow}")),
                    }
                    continue;
                }

                let (guard, source) = match field.optionality {
                    Optionality::Required => (None, format!("{shadow}.Get()")),
                    Optionality::Pointer if *required => (None, format!("{shadow}.Get()")),
                    Optionality::Optional => (Some(format!("{shadow} != \"\"")), shadow.clone()),
                    Optionality::Pointer => (Some(format!("{shadow} != nil")), format!("*{shadow}")),
                    Optionality::OptionalNullable => {
                        (Some(format!("{shadow}.IsSet()")), format!("{shadow}.Get()"))
                    }
                };
                let var = format_var_name(&format!("{ident}Value"));
                let body = |s: &mut Sink| {
                    let mut value = var.clone();
                    s.line(format!("{var} := {source}"));
                    if field.trimmable {
                        s.line(format!("{var} = {trim}({var})"));
                    }
                    if field.regex.is_some() {
                        let regex = format_var_name(&format!("{name}{ident}Regex"));
                        s.block(format!("if !{regex}.MatchString({var})"), |s| {
                            s.line(format!(
                                "return {mismatch}{{Field: {json}, Pattern: {regex}.String()}}"
                            ))
                        });
                    }
                    if let Some(parse) = parse {
                        let parsed = format_var_name(&format!("{ident}Parsed"));
                        s.line(format!("{parsed}, err := {parse}({var})"));
                        s.block("if err != nil", |s| {
                            s.line(format!("return {errorf}(\"%s: %w\", {json}, err)"))
                        });
                        value = parsed;
                    }
                    match field.optionality {
                        Optionality::Required | Optionality::Optional => {
                            s.line(format!("{recv}.{ident} = {value}"))
                        }
                        Optionality::Pointer => s.line(format!("{recv}.{ident} = &{value}")),
                        Optionality::OptionalNullable => {
                            s.line(format!("{recv}.{ident} = {new_optional}({value})"))
                        }
                    }
                };
                match guard {
                    None => body(s),
                    Some(guard) => {
                        s.line(format!("if {guard} {{"));
                        s.indent();
                        body(s);
                        s.dedent();
                        match (field.optionality, optional) {
                            (Optionality::OptionalNullable, Some(optional)) => {
                                s.line("} else {");
                                s.indent();
                                s.line(format!(
                                    "{recv}.{ident} = {optional}{{isNull: {shadow}.IsNull()}}"
                                ));
                                s.dedent();
                                s.line("}");
                            }
                            _ => s.line("}"),
                        }
                    }
                }
            }
            s.line("return nil");
        });
    }

    fn emit_validator(&self, sink: &mut Sink, name: &str, object: &ObjectIr) {
        let recv = receiver(name);
        let validation = sink.import(VALIDATION);

        let mut lines = vec![];
        for field in object.fields.values() {
            if !self.field_validates(field) {
                continue;
            }
            let ident = exported(&field.json_name);
            let pattern = format_var_name(&format!("{name}{ident}Pattern"));
            let mut args = vec![format!("&{recv}.{ident}")];
            if self.skips_when_empty(field) {
                args.push(format!("{validation}.Skip.When({recv}.{ident} == \"\")"));
            }
            args.extend(
                self.rules(field)
                    .iter()
                    .map(|rule| rule.render(&validation, Some(&pattern))),
            );
            lines.push(format!("{validation}.Field({}),", args.join(", ")));
        }

        sink.block(format!("func ({recv} {name}) Validate() error"), |s| {
            s.line(format!("return {validation}.ValidateStruct(&{recv},"));
            s.indent();
            for line in &lines {
                s.line(line);
            }
            s.dedent();
            s.line(")");
        });
    }

    fn emit_enum(&self, sink: &mut Sink, name: &str, enum_: &EnumIr) -> Result<()> {
        let recv = receiver(name);
        let base = self.primitive_type(sink, enum_.base);
        sink.line(format!("type {name} {base}"));
        sink.blank();

        let mut rows = vec![];
        for member in &enum_.members {
            let constant = format!("{name}{}", member.tag);
            sink.declare(&constant, &format!("member of {name}"))?;
            let literal = match &member.literal {
                EnumLiteral::String(s) => quote(s),
                EnumLiteral::Int(i) => i.to_string(),
            };
            rows.push(vec![constant, name.to_string(), "=".to_string(), literal]);
        }
        sink.block_with("const (", ")", |s| s.rows(&rows));
        sink.blank();

        let members: Vec<_> = enum_
            .members
            .iter()
            .map(|member| format!("{name}{}", member.tag))
            .collect();
        let invalid = self.component(sink, "InvalidEnumValueError");
        sink.block(format!("func ({recv} {name}) Check() error"), |s| {
            s.line(format!("switch {recv} {{"));
            s.line(format!("case {}:", members.join(", ")));
            s.indent();
            s.line("return nil");
            s.dedent();
            s.line("default:");
            s.indent();
            s.line(format!(
                "return {invalid}{{Type: {}, Value: {recv}}}",
                quote(name)
            ));
            s.dedent();
            s.line("}");
        });
        sink.blank();

        let unmarshal = sink.qual("encoding/json", "Unmarshal");
        sink.block(format!("func ({recv} *{name}) UnmarshalJSON(data []byte) error"), |s| {
            s.block("if string(data) == \"null\"", |s| s.line("return nil"));
            s.line(format!("var value {base}"));
            s.block(format!("if err := {unmarshal}(data, &value); err != nil"), |s| {
                s.line("return err")
            });
            s.line(format!("result := {name}(value)"));
            s.block("if err := result.Check(); err != nil", |s| s.line("return err"));
            s.line(format!("*{recv} = result"));
            s.line("return nil");
        });
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::v3::codegen::backend::go::IMPORT_ALIASES;
    use crate::v3::codegen::ir::Program;
    use crate::v3::codegen::lowerer::Lowerer;
    use crate::v3::Document;

    fn program(yaml: &str) -> Program {
        let document = Document::from_text(yaml, "test.yaml").unwrap();
        Lowerer::new(&document.spec)
            .lower(document.canonical_json(), Config::new("api", "out"))
            .unwrap()
    }

    fn emit(program: &Program) -> String {
        let mut sink = Sink::new("\t", Some("api"), IMPORT_ALIASES);
        Context::new(program, None).emit_components(&mut sink).unwrap();
        sink.body()
    }

    /// The top-level declaration starting at `header`, through its closing brace.
    fn declaration<'b>(body: &'b str, header: &str) -> &'b str {
        let start = body.find(header).unwrap();
        let end = body[start..].find("\n}\n").unwrap();
        &body[start..start + end + 3]
    }

    const TRANSACTION: &str = r#"
openapi: 3.0.3
info: {title: shop, version: "1"}
paths: {}
components:
  schemas:
    TransactionCreate:
      type: object
      required: [description, amount, count]
      properties:
        description:
          type: string
          minLength: 8
          maxLength: 100
          x-go-string-trimmable: true
        amount:
          type: number
          minimum: 0.009
          exclusiveMinimum: true
        count:
          type: integer
          minimum: 0.5
          maximum: 10
        details:
          type: string
          nullable: true
        status:
          $ref: '#/components/schemas/Status'
    Status:
      type: string
      enum: [active, blocked]
"#;

    #[test]
    fn bound_literals() {
        let bound = |value, exclusive| Bound { value, exclusive };
        assert_eq!(bound_literal(bound(0.009, true), false, true), ("0.009".into(), true));
        assert_eq!(bound_literal(bound(0.5, true), true, true), ("1".into(), false));
        assert_eq!(bound_literal(bound(10.7, false), true, false), ("10".into(), false));
        assert_eq!(bound_literal(bound(3.0, true), true, true), ("3".into(), true));
        assert_eq!(bound_literal(bound(1.0, false), false, true), ("1.0".into(), false));
    }

    #[test]
    fn emits_struct_decoder_and_validator() {
        let program = program(TRANSACTION);
        let body = emit(&program);

        assert!(body.contains("type TransactionCreate struct {\n\tDescription string "));
        assert!(body.contains("\tDetails     Optional[string] `json:\"details\" xml:\"details\"`"));
        assert!(body.contains("\tStatus      Status "));
        assert!(body.contains("func (t *TransactionCreate) UnmarshalJSON(data []byte) error {"));
        assert!(body.contains(
            "\tif shadow.Description.IsNull() {\n\t\treturn RequiredFieldNullError{Field: \"description\"}\n\t}"
        ));
        assert!(body.contains("\tdescriptionValue = strings.TrimSpace(descriptionValue)\n\tt.Description = descriptionValue\n"));
        assert!(body.contains("\tt.Amount = shadow.Amount.Get()\n"));
        assert!(body.contains("\tt.Details = shadow.Details\n"));
        assert!(body.contains("func (t TransactionCreate) Validate() error {"));
        assert!(body.contains(
            "validation.Field(&t.Description, validation.Required, validation.RuneLength(8, 100)),"
        ));
        assert!(body.contains("validation.Field(&t.Amount, validation.Min(0.009).Exclusive()),"));
        assert!(body.contains("validation.Field(&t.Count, validation.Min(1), validation.Max(10)),"));
        assert!(!body.contains("validation.Field(&t.Status"));
    }

    #[test]
    fn emits_enums() {
        let program = program(TRANSACTION);
        let body = emit(&program);
        assert!(body.contains("type Status string\n\nconst (\n\tStatusActive  Status = \"active\"\n\tStatusBlocked Status = \"blocked\"\n)"));
        assert!(body.contains("\tcase StatusActive, StatusBlocked:\n\t\treturn nil\n"));
        assert!(body.contains("return InvalidEnumValueError{Type: \"Status\", Value: s}"));
        assert!(body.contains("\tresult := Status(value)\n"));
    }

    #[test]
    fn emits_aliases_and_nested_validation() {
        let program = program(
            r#"
openapi: 3.0.3
info: {title: shop, version: "1"}
paths: {}
components:
  schemas:
    Labels:
      type: object
      additionalProperties:
        type: string
    Anything:
      type: object
      additionalProperties: true
    Empty:
      type: object
    Names:
      type: array
      items:
        type: string
    Choice:
      oneOf:
        - $ref: '#/components/schemas/Names'
        - type: integer
    Money:
      type: object
      x-go-type: github.com/shopspring/decimal.Decimal
      x-go-type-string-parse: github.com/shopspring/decimal.NewFromString
    Order:
      type: object
      properties:
        names:
          type: array
          minItems: 1
          items:
            type: string
        price:
          $ref: '#/components/schemas/Money'
        code:
          type: string
          pattern: '^[A-Z]{3}$'
          x-go-regex: '^[A-Z]+$'
"#,
        );
        let body = emit(&program);
        assert!(body.contains("type Labels = map[string]string\n"));
        assert!(body.contains("type Anything = map[string]interface{}\n"));
        assert!(body.contains("type Empty struct{}\n"));
        assert!(body.contains("type Names = []string\n"));
        assert!(body.contains("type Choice = interface{}\n"));
        assert!(body.contains("type Money = decimal.Decimal\n"));

        assert!(body.contains("\torderCodeRegex   = regexp.MustCompile(`^[A-Z]+$`)\n"));
        assert!(body.contains("\torderCodePattern = regexp.MustCompile(`^[A-Z]{3}$`)\n"));
        assert!(body.contains(
            "\t\tif !orderCodeRegex.MatchString(codeValue) {\n\t\t\treturn PatternMismatchError{Field: \"code\", Pattern: orderCodeRegex.String()}\n\t\t}"
        ));
        assert!(body.contains("\t\tpriceParsed, err := decimal.NewFromString(priceValue)\n"));
        assert!(body.contains("validation.Field(&o.Names, validation.Length(1, 0)),"));
        assert!(body.contains("validation.Field(&o.Price),"));
        assert!(body.contains("validation.Field(&o.Code, validation.Match(orderCodePattern)),"));
    }

    #[test]
    fn decoder_and_validator_per_field_kind() {
        let program = program(
            r#"
openapi: 3.0.3
info: {title: shop, version: "1"}
paths: {}
components:
  schemas:
    Profile:
      type: object
      required: [name, owner, tags]
      properties:
        name:
          type: string
          minLength: 1
        nickname:
          type: string
          x-go-omitempty: true
        bio:
          type: string
          nullable: true
          x-go-omitempty: true
        avatar:
          type: string
          x-go-pointer: true
        owner:
          type: string
          x-go-pointer: true
        tags:
          type: array
          minItems: 1
          items:
            type: string
        status:
          $ref: '#/components/schemas/Status'
    Status:
      type: string
      enum: [active, blocked]
"#,
        );
        let body = emit(&program);

        assert_eq!(
            declaration(&body, "type Profile struct {"),
            concat!(
                "type Profile struct {\n",
                "\tName     string           `json:\"name\" xml:\"name\"`\n",
                "\tNickname string           `json:\"nickname,omitempty\" xml:\"nickname,omitempty\"`\n",
                "\tBio      Optional[string] `json:\"bio,omitzero\" xml:\"bio,omitempty\"`\n",
                "\tAvatar   *string          `json:\"avatar\" xml:\"avatar\"`\n",
                "\tOwner    *string          `json:\"owner\" xml:\"owner\"`\n",
                "\tTags     []string         `json:\"tags\" xml:\"tags\"`\n",
                "\tStatus   Status           `json:\"status\" xml:\"status\"`\n",
                "}\n",
            )
        );
        assert_eq!(
            declaration(&body, "func (p *Profile) UnmarshalJSON(data []byte) error {"),
            concat!(
                "func (p *Profile) UnmarshalJSON(data []byte) error {\n",
                "\tif string(data) == \"null\" {\n",
                "\t\treturn nil\n",
                "\t}\n",
                "\tvar shadow struct {\n",
                "\t\tName     Optional[string]   `json:\"name\"`\n",
                "\t\tNickname string             `json:\"nickname\"`\n",
                "\t\tBio      Optional[string]   `json:\"bio\"`\n",
                "\t\tAvatar   *string            `json:\"avatar\"`\n",
                "\t\tOwner    Optional[string]   `json:\"owner\"`\n",
                "\t\tTags     Optional[[]string] `json:\"tags\"`\n",
                "\t\tStatus   Status             `json:\"status\"`\n",
                "\t}\n",
                "\tif err := json.Unmarshal(data, &shadow); err != nil {\n",
                "\t\treturn err\n",
                "\t}\n",
                "\tif shadow.Name.IsNull() {\n",
                "\t\treturn RequiredFieldNullError{Field: \"name\"}\n",
                "\t}\n",
                "\tif !shadow.Name.IsSet() {\n",
                "\t\treturn RequiredFieldMissingError{Field: \"name\"}\n",
                "\t}\n",
                "\tp.Name = shadow.Name.Get()\n",
                "\tp.Nickname = shadow.Nickname\n",
                "\tp.Bio = shadow.Bio\n",
                "\tp.Avatar = shadow.Avatar\n",
                "\tif shadow.Owner.IsNull() {\n",
                "\t\treturn RequiredFieldNullError{Field: \"owner\"}\n",
                "\t}\n",
                "\tif !shadow.Owner.IsSet() {\n",
                "\t\treturn RequiredFieldMissingError{Field: \"owner\"}\n",
                "\t}\n",
                "\townerValue := shadow.Owner.Get()\n",
                "\tp.Owner = &ownerValue\n",
                "\tif shadow.Tags.IsNull() {\n",
                "\t\treturn RequiredFieldNullError{Field: \"tags\"}\n",
                "\t}\n",
                "\tif !shadow.Tags.IsSet() {\n",
                "\t\treturn RequiredFieldMissingError{Field: \"tags\"}\n",
                "\t}\n",
                "\tp.Tags = shadow.Tags.Get()\n",
                "\tp.Status = shadow.Status\n",
                "\treturn nil\n",
                "}\n",
            )
        );
        assert_eq!(
            declaration(&body, "func (p Profile) Validate() error {"),
            concat!(
                "func (p Profile) Validate() error {\n",
                "\treturn validation.ValidateStruct(&p,\n",
                "\t\tvalidation.Field(&p.Name, validation.Required, validation.RuneLength(1, 0)),\n",
                "\t\tvalidation.Field(&p.Tags, validation.Required, validation.Length(1, 0)),\n",
                "\t)\n",
                "}\n",
            )
        );
        // unknown members such as "pending" are rejected while decoding
        assert_eq!(
            declaration(&body, "func (s *Status) UnmarshalJSON(data []byte) error {"),
            concat!(
                "func (s *Status) UnmarshalJSON(data []byte) error {\n",
                "\tif string(data) == \"null\" {\n",
                "\t\treturn nil\n",
                "\t}\n",
                "\tvar value string\n",
                "\tif err := json.Unmarshal(data, &value); err != nil {\n",
                "\t\treturn err\n",
                "\t}\n",
                "\tresult := Status(value)\n",
                "\tif err := result.Check(); err != nil {\n",
                "\t\treturn err\n",
                "\t}\n",
                "\t*s = result\n",
                "\treturn nil\n",
                "}\n",
            )
        );
    }

    #[test]
    fn required_pointer_fields_are_presence_checked() {
        let program = program(
            r#"
openapi: 3.0.3
info: {title: shop, version: "1"}
paths: {}
components:
  schemas:
    Account:
      type: object
      required: [owner]
      properties:
        owner:
          type: string
          x-go-pointer: true
        nickname:
          type: string
          x-go-pointer: true
"#,
        );
        let body = emit(&program);
        assert!(body.contains("\t\tOwner    Optional[string] `json:\"owner\"`\n"));
        assert!(body.contains("\t\tNickname *string          `json:\"nickname\"`\n"));
        assert!(body.contains(
            "\tif shadow.Owner.IsNull() {\n\t\treturn RequiredFieldNullError{Field: \"owner\"}\n\t}\n\tif !shadow.Owner.IsSet() {\n\t\treturn RequiredFieldMissingError{Field: \"owner\"}\n\t}\n\townerValue := shadow.Owner.Get()\n\ta.Owner = &ownerValue\n"
        ));
        assert!(body.contains("\ta.Nickname = shadow.Nickname\n"));
        assert!(!body.contains("shadow.Nickname.IsSet()"));
    }

    #[test]
    fn format_types_validate_themselves() {
        let program = program(
            r#"
openapi: 3.0.3
info: {title: shop, version: "1"}
paths: {}
components:
  schemas:
    Contact:
      type: object
      required: [email]
      properties:
        email:
          type: string
          format: email
        country:
          type: string
          format: iso3166-alpha-2
        currencies:
          type: array
          items:
            type: string
            format: iso4217-currency-code
        backup:
          type: string
          format: email
          nullable: true
"#,
        );
        let body = emit(&program);
        let validator = body
            .split("func (c Contact) Validate() error {\n")
            .nth(1)
            .unwrap()
            .split("\n}\n")
            .next()
            .unwrap();
        assert_eq!(
            validator,
            "\treturn validation.ValidateStruct(&c,\n\
             \t\tvalidation.Field(&c.Email),\n\
             \t\tvalidation.Field(&c.Country, validation.Skip.When(c.Country == \"\")),\n\
             \t\tvalidation.Field(&c.Currencies),\n\
             \t\tvalidation.Field(&c.Backup),\n\
             \t)"
        );
    }

    #[test]
    fn skip_validation_drops_the_validator() {
        let program = program(
            r#"
openapi: 3.0.3
info: {title: shop, version: "1"}
paths: {}
components:
  schemas:
    Loose:
      type: object
      x-go-skip-validation: true
      properties:
        name:
          type: string
          maxLength: 3
"#,
        );
        let body = emit(&program);
        assert!(!body.contains("func (l Loose) Validate() error"));
    }
}
