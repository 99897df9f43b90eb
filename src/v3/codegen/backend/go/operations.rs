//! Request DTOs and their parsers.

use crate::error::Result;
use crate::name::exported;
use crate::v3::codegen::backend::go::components::{receiver, Rule};
use crate::v3::codegen::backend::go::types::Conversion;
use crate::v3::codegen::backend::go::{
    format_var_name, quote, quote_pattern, Context, CHI, VALIDATION,
};
use crate::v3::codegen::ir::{
    BodyContent, Operation, ParamLocation, Parameter, PrimitiveKind, SchemaIr,
};
use crate::v3::codegen::sink::Sink;

use log::trace;

/// One request type with its parser; operations accepting several content
/// types get one variant per content type.
pub(super) struct RequestVariant<'o> {
    pub type_name: String,
    pub parser: String,
    /// Service method handling this variant.
    pub method: String,
    pub content: Option<&'o BodyContent>,
}

pub(super) fn request_variants(operation: &Operation) -> Vec<RequestVariant<'_>> {
    let contents = operation.body_contents();
    if contents.len() <= 1 {
        let type_name = format!("{}Request", operation.name);
        return vec![RequestVariant {
            parser: format!("parse{type_name}"),
            type_name,
            method: operation.name.clone(),
            content: contents.first(),
        }];
    }
    contents
        .iter()
        .map(|content| {
            let type_name = format!("{}{}Request", operation.name, content.tag);
            RequestVariant {
                parser: format!("parse{type_name}"),
                type_name,
                method: format!("{}{}", operation.name, content.tag),
                content: Some(content),
            }
        })
        .collect()
}

/// How a request body is read off the wire.
enum BodyDecoding {
    Json,
    Xml,
    Raw { text: bool },
}

fn body_decoding(context: &Context<'_>, content: &BodyContent) -> BodyDecoding {
    let media = content
        .content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    match context.resolve(&content.schema).as_primitive() {
        Some(PrimitiveKind::Bytes) => return BodyDecoding::Raw { text: false },
        Some(PrimitiveKind::String) if media.starts_with("text/") => {
            return BodyDecoding::Raw { text: true }
        }
        _ => {}
    }
    if media.ends_with("/xml") || media.ends_with("+xml") {
        BodyDecoding::Xml
    } else {
        BodyDecoding::Json
    }
}

/// Names of the processing result declarations as seen from the router package.
pub(super) struct ResultNames {
    prefix: String,
    pub result: String,
    pub new_result: String,
}

impl ResultNames {
    pub fn new(context: &Context<'_>, sink: &mut Sink) -> Self {
        let result = context.component(sink, "RequestProcessingResult");
        let prefix = result
            .strip_suffix("RequestProcessingResult")
            .unwrap_or_default()
            .to_string();
        Self {
            new_result: format!("{prefix}NewRequestProcessingResult"),
            prefix,
            result,
        }
    }

    pub fn kind(&self, kind: &str) -> String {
        format!("{}{kind}", self.prefix)
    }

    /// Qualified name of any other components declaration.
    pub fn component(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    /// Records a failure, fires its hook and returns from the parser.
    pub fn fail(&self, sink: &mut Sink, kind: &str, err: &str, hook: &str, hook_args: &[&str]) {
        sink.line(format!(
            "request.ProcessingResult = {}({}, {err})",
            self.new_result,
            self.kind(kind)
        ));
        let mut args = vec!["r"];
        args.extend_from_slice(hook_args);
        args.push("request.ProcessingResult");
        sink.block(format!("if hooks.{hook} != nil"), |s| {
            s.line(format!("hooks.{hook}({})", args.join(", ")))
        });
        sink.line("return");
    }
}

fn location_struct(operation: &Operation, location: ParamLocation) -> String {
    format!("{}Request{}", operation.name, location.title())
}

fn param_var(location: ParamLocation, param: &Parameter, suffix: &str) -> String {
    format_var_name(&format!("{}{}{suffix}", location.title(), exported(&param.name)))
}

fn param_pattern_var(operation: &Operation, param: &Parameter, suffix: &str) -> String {
    format_var_name(&format!(
        "{}{}{}{suffix}",
        operation.name,
        param.location.title(),
        exported(&param.name)
    ))
}

impl Context<'_> {
    pub(super) fn emit_request(&self, sink: &mut Sink, operation: &Operation) -> Result<()> {
        trace!("emitting request types of `{}`", operation.name);
        let owner = format!("operation {}", operation.name);

        for location in ParamLocation::ALL {
            let params: Vec<_> = operation.parameters_in(location).collect();
            if params.is_empty() {
                continue;
            }
            let name = location_struct(operation, location);
            sink.declare(&name, &owner)?;

            let mut rows = vec![];
            for param in &params {
                rows.push(vec![
                    exported(&param.name),
                    self.scalar_field_type(sink, &param.field).to_string(),
                ]);
            }
            sink.blank();
            sink.block(format!("type {name} struct"), |s| s.rows(&rows));

            let validated: Vec<_> = params
                .iter()
                .filter(|param| self.field_validates(&param.field))
                .collect();
            if !validated.is_empty() {
                let recv = receiver(&name);
                let validation = sink.import(VALIDATION);
                let mut lines = vec![];
                for param in &validated {
                    let pattern = param_pattern_var(operation, param, "Pattern");
                    let mut args = vec![format!("&{recv}.{}", exported(&param.name))];
                    args.extend(
                        self.rules(&param.field)
                            .iter()
                            .map(|rule| rule.render(&validation, Some(&pattern))),
                    );
                    lines.push(format!("{validation}.Field({}),", args.join(", ")));
                }
                sink.blank();
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
        }

        let mut patterns = vec![];
        for param in &operation.parameters {
            if let Some(regex) = &param.field.regex {
                patterns.push((param_pattern_var(operation, param, "Regex"), regex.as_str()));
            }
            let matches = self
                .rules(&param.field)
                .contains(&Rule::Match);
            if let (Some(pattern), true) = (&param.field.constraints.pattern, matches) {
                patterns.push((param_pattern_var(operation, param, "Pattern"), pattern.as_str()));
            }
        }
        if !patterns.is_empty() {
            let compile = sink.qual("regexp", "MustCompile");
            let mut rows = vec![];
            for (var, pattern) in &patterns {
                sink.declare(var, &owner)?;
                rows.push(vec![
                    var.clone(),
                    "=".to_string(),
                    format!("{compile}({})", quote_pattern(pattern)),
                ]);
            }
            sink.blank();
            sink.block_with("var (", ")", |s| s.rows(&rows));
        }

        let names = ResultNames::new(self, sink);
        for variant in request_variants(operation) {
            sink.declare(&variant.type_name, &owner)?;
            sink.declare(&variant.parser, &owner)?;

            let mut rows = vec![];
            for location in ParamLocation::ALL {
                if operation.parameters_in(location).next().is_some() {
                    rows.push(vec![
                        location.title().to_string(),
                        location_struct(operation, location),
                    ]);
                }
            }
            if let Some(content) = variant.content {
                rows.push(vec!["Body".into(), self.go_type(sink, &content.schema).to_string()]);
            }
            rows.push(vec!["ProcessingResult".into(), names.result.clone()]);

            sink.blank();
            sink.block(format!("type {} struct", variant.type_name), |s| s.rows(&rows));
            sink.blank();
            self.emit_parser(sink, operation, &variant, &names);
        }
        Ok(())
    }

    fn emit_parser(
        &self,
        sink: &mut Sink,
        operation: &Operation,
        variant: &RequestVariant<'_>,
        names: &ResultNames,
    ) {
        let request = sink.qual("net/http", "Request");
        let op = quote(&operation.name);

        // everything that touches the sink is resolved before the body is written
        let security = if operation.has_security() {
            let alternatives: Vec<String> = operation
                .security
                .iter()
                .map(|requirement| {
                    let schemes: Vec<String> = requirement
                        .schemes
                        .iter()
                        .map(|scheme| format!("SecurityScheme{}", exported(scheme)))
                        .collect();
                    format!("{{{}}}", schemes.join(", "))
                })
                .collect();
            Some(format!("[][]SecurityScheme{{{}}}", alternatives.join(", ")))
        } else {
            None
        };

        let mut locations = vec![];
        for location in ParamLocation::ALL {
            let params: Vec<_> = operation.parameters_in(location).collect();
            if params.is_empty() {
                continue;
            }
            let mut prepared = vec![];
            for param in params {
                prepared.push(self.prepare_param(sink, operation, param, names));
            }
            let validated = operation
                .parameters_in(location)
                .any(|param| self.field_validates(&param.field));
            locations.push((location, prepared, validated));
        }

        let body = variant.content.map(|content| {
            let required = operation
                .request_body
                .as_ref()
                .is_some_and(|body| body.required);
            let decoding = body_decoding(self, content);
            let decode = match decoding {
                BodyDecoding::Json => format!(
                    "{}(r.Body).Decode(&request.Body)",
                    sink.qual("encoding/json", "NewDecoder")
                ),
                BodyDecoding::Xml => format!(
                    "{}(r.Body).Decode(&request.Body)",
                    sink.qual("encoding/xml", "NewDecoder")
                ),
                BodyDecoding::Raw { .. } => format!("{}(r.Body)", sink.qual("io", "ReadAll")),
            };
            let eof = (!required).then(|| {
                (sink.qual("errors", "Is"), sink.qual("io", "EOF"))
            });
            let validate = self
                .nested_validates(&content.schema)
                .then(|| sink.qual(VALIDATION, "Validate"));
            (decoding, decode, eof, validate)
        });

        sink.block(
            format!(
                "func {}(r *{request}, hooks *Hooks, processors []securityProcessor) (request {})",
                variant.parser, variant.type_name
            ),
            |s| {
                s.line(format!(
                    "request.ProcessingResult = {}({}, nil)",
                    names.new_result,
                    names.kind("ParseSucceed")
                ));
                if let Some(alternatives) = &security {
                    s.block(
                        format!(
                            "if result, ok := checkSecurity(r, hooks, processors, {op}, {alternatives}); !ok"
                        ),
                        |s| {
                            s.line("request.ProcessingResult = result");
                            s.line("return");
                        },
                    );
                }

                for (location, prepared, validated) in &locations {
                    let title = location.title();
                    s.blank();
                    for param in prepared {
                        param.write(s, names, &op);
                    }
                    let hook = format!("Request{title}ParseCompleted");
                    s.block(format!("if hooks.{hook} != nil"), |s| {
                        s.line(format!("hooks.{hook}(r, {op})"))
                    });
                    if *validated {
                        s.block(
                            format!("if err := request.{title}.Validate(); err != nil"),
                            |s| {
                                names.fail(
                                    s,
                                    &format!("{title}ValidationFailed"),
                                    "err",
                                    &format!("Request{title}ValidationFailed"),
                                    &[op.as_str()],
                                )
                            },
                        );
                    }
                }

                if let Some((decoding, decode, eof, validate)) = &body {
                    s.blank();
                    let fail_unmarshal = |s: &mut Sink, err: &str| {
                        names.fail(s, "BodyUnmarshalFailed", err, "RequestBodyUnmarshalFailed", &[op.as_str()])
                    };
                    let guard = match decoding {
                        BodyDecoding::Raw { text } => {
                            s.line(format!("body, err := {decode}"));
                            s.block("if err != nil", |s| fail_unmarshal(s, "err"));
                            if *text {
                                s.line("request.Body = string(body)");
                            } else {
                                s.line("request.Body = body");
                            }
                            None
                        }
                        _ => match eof {
                            Some((is, eof)) => {
                                s.line(format!("decodeErr := {decode}"));
                                s.block(
                                    format!("if decodeErr != nil && !{is}(decodeErr, {eof})"),
                                    |s| fail_unmarshal(s, "decodeErr"),
                                );
                                Some("decodeErr == nil")
                            }
                            None => {
                                s.block(format!("if err := {decode}; err != nil"), |s| {
                                    fail_unmarshal(s, "err")
                                });
                                None
                            }
                        },
                    };
                    s.block("if hooks.RequestBodyUnmarshalCompleted != nil", |s| {
                        s.line(format!("hooks.RequestBodyUnmarshalCompleted(r, {op})"))
                    });
                    if let Some(validate) = validate {
                        let check = |s: &mut Sink| {
                            s.block(
                                format!("if err := {validate}(request.Body); err != nil"),
                                |s| {
                                    names.fail(
                                        s,
                                        "BodyValidationFailed",
                                        "err",
                                        "RequestBodyValidationFailed",
                                        &[op.as_str()],
                                    )
                                },
                            )
                        };
                        match guard {
                            Some(guard) => s.block(format!("if {guard}"), check),
                            None => check(s),
                        }
                    }
                }

                s.blank();
                s.block("if hooks.RequestParseCompleted != nil", |s| {
                    s.line(format!("hooks.RequestParseCompleted(r, {op})"))
                });
                s.line("return");
            },
        );
    }

    fn prepare_param(
        &self,
        sink: &mut Sink,
        operation: &Operation,
        param: &Parameter,
        names: &ResultNames,
    ) -> PreparedParam {
        let location = param.location;
        let key = quote(&param.name);
        let is_array = matches!(self.resolve(&param.field.schema), SchemaIr::Array { .. });
        let source = match (location, is_array) {
            (ParamLocation::Path, _) => format!("{}(r, {key})", sink.qual(CHI, "URLParam")),
            (ParamLocation::Query, true) => format!("r.URL.Query()[{key}]"),
            (ParamLocation::Query, false) => format!("r.URL.Query().Get({key})"),
            (ParamLocation::Header, _) => format!("r.Header.Get({key})"),
        };
        let raw = param_var(location, param, "Raw");
        let element = match self.resolve(&param.field.schema) {
            SchemaIr::Array { element, .. } => element.as_ref(),
            _ => &param.field.schema,
        };
        let conversion = self.conversion(sink, element, &raw);
        let atoi = matches!(conversion, Conversion::IntEnum(_)).then(|| sink.qual("strconv", "Atoi"));
        PreparedParam {
            location,
            name: param.name.clone(),
            field: exported(&param.name),
            source,
            raw,
            value: param_var(location, param, "Value"),
            required: param.field.is_required(),
            is_array,
            trim: param
                .field
                .trimmable
                .then(|| sink.qual("strings", "TrimSpace")),
            regex: param
                .field
                .regex
                .as_ref()
                .map(|_| param_pattern_var(operation, param, "Regex")),
            conversion,
            atoi,
            missing: "RequiredParameterMissingError".to_string(),
            mismatch: names.component("PatternMismatchError"),
        }
    }
}

/// A parameter with every qualified name it needs already resolved.
struct PreparedParam {
    location: ParamLocation,
    name: String,
    field: String,
    source: String,
    raw: String,
    value: String,
    required: bool,
    is_array: bool,
    trim: Option<String>,
    regex: Option<String>,
    conversion: Conversion,
    atoi: Option<String>,
    missing: String,
    mismatch: String,
}

impl PreparedParam {
    fn write(&self, s: &mut Sink, names: &ResultNames, op: &str) {
        let title = self.location.title();
        let key = quote(&self.name);
        let kind = format!("{title}ParseFailed");
        let hook = format!("Request{title}ParseFailed");
        let fail = |s: &mut Sink, err: &str| names.fail(s, &kind, err, &hook, &[op, key.as_str()]);
        let missing = format!("{}{{Parameter: {key}}}", self.missing);
        let target = format!("request.{title}.{}", self.field);

        if self.is_array {
            if self.required {
                s.block(format!("if len({}) == 0", self.source), |s| fail(s, &missing));
            }
            s.block(format!("for _, {} := range {}", self.raw, self.source), |s| {
                self.convert(s, &fail);
                s.line(format!("{target} = append({target}, {})", self.value));
            });
            return;
        }

        s.line(format!("{} := {}", self.raw, self.source));
        if let Some(trim) = &self.trim {
            s.line(format!("{raw} = {trim}({raw})", raw = self.raw));
        }
        if self.required {
            s.block(format!("if {} == \"\"", self.raw), |s| fail(s, &missing));
            self.convert(s, &fail);
            s.line(format!("{target} = {}", self.value));
        } else {
            s.block(format!("if {} != \"\"", self.raw), |s| {
                self.convert(s, &fail);
                s.line(format!("{target}.Set({})", self.value));
            });
        }
    }

    fn convert(&self, s: &mut Sink, fail: &dyn Fn(&mut Sink, &str)) {
        let (raw, value) = (&self.raw, &self.value);
        if self.is_array {
            if let Some(trim) = &self.trim {
                s.line(format!("{raw} = {trim}({raw})"));
            }
        }
        if let Some(regex) = &self.regex {
            let key = quote(&self.name);
            s.block(format!("if !{regex}.MatchString({raw})"), |s| {
                fail(
                    s,
                    &format!(
                        "{}{{Field: {key}, Pattern: {regex}.String()}}",
                        self.mismatch
                    ),
                )
            });
        }
        match &self.conversion {
            Conversion::Direct(expr) => s.line(format!("{value} := {expr}")),
            Conversion::Fallible(expr) => {
                s.line(format!("{value}, err := {expr}"));
                s.block("if err != nil", |s| fail(s, "err"));
            }
            Conversion::Enum(expr) => {
                s.line(format!("{value} := {expr}"));
                s.block(format!("if err := {value}.Check(); err != nil"), |s| fail(s, "err"));
            }
            Conversion::Validated(expr) => {
                s.line(format!("{value} := {expr}"));
                s.block(format!("if err := {value}.Validate(); err != nil"), |s| {
                    fail(s, "err")
                });
            }
            Conversion::IntEnum(ty) => {
                let number = format!("{value}Int");
                let atoi = self.atoi.as_deref().unwrap_or("strconv.Atoi");
                s.line(format!("{number}, err := {atoi}({raw})"));
                s.block("if err != nil", |s| fail(s, "err"));
                s.line(format!("{value} := {ty}({number})"));
                s.block(format!("if err := {value}.Check(); err != nil"), |s| fail(s, "err"));
            }
        }
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

    fn emit(program: &Program, name: &str) -> String {
        let mut sink = Sink::new("\t", Some("api"), IMPORT_ALIASES);
        let context = Context::new(program, None);
        let operation = program
            .operations
            .iter()
            .find(|operation| operation.name == name)
            .unwrap();
        context.emit_request(&mut sink, operation).unwrap();
        sink.body()
    }

    const USERS: &str = r#"
openapi: 3.0.3
info: {title: users, version: "1"}
paths:
  /users/{id}:
    get:
      tags: [users]
      parameters:
        - name: id
          in: path
          required: true
          schema:
            type: string
            format: uuid
        - name: include
          in: query
          schema:
            type: string
            enum: [orders, payments]
        - name: limit
          in: query
          schema:
            type: integer
            minimum: 1
        - name: X-Request-Id
          in: header
          schema:
            type: string
          x-go-string-trimmable: true
      responses:
        "200":
          description: ok
  /users:
    post:
      requestBody:
        content:
          application/json:
            schema:
              type: object
              required: [name]
              properties:
                name:
                  type: string
                  minLength: 1
          application/xml:
            schema:
              type: string
      responses:
        "201":
          description: created
"#;

    #[test]
    fn parses_parameters_by_location() {
        let program = program(USERS);
        let body = emit(&program, "GetUsersID");

        assert!(body.contains("type GetUsersIDRequestPath struct {\n\tID uuid.UUID\n}"));
        assert!(body.contains("\tInclude Optional[GetUsersIDQueryInclude]\n"));
        assert!(body.contains("\tLimit   Optional[int]\n"));
        assert!(body.contains("validation.Field(&g.Limit, validation.Min(1)),"));
        assert!(body.contains(
            "func parseGetUsersIDRequest(r *http.Request, hooks *Hooks, processors []securityProcessor) (request GetUsersIDRequest) {"
        ));
        assert!(body.contains("\tpathIdRaw := chi.URLParam(r, \"id\")\n\tif pathIdRaw == \"\" {\n"));
        assert!(body.contains(
            "\t\trequest.ProcessingResult = NewRequestProcessingResult(PathParseFailed, RequiredParameterMissingError{Parameter: \"id\"})\n"
        ));
        assert!(body.contains("\t\t\thooks.RequestPathParseFailed(r, \"GetUsersID\", \"id\", request.ProcessingResult)\n"));
        assert!(body.contains("\tpathIdValue, err := uuid.Parse(pathIdRaw)\n"));
        assert!(body.contains("\trequest.Path.ID = pathIdValue\n"));
        assert!(body.contains("\t\tqueryIncludeValue := GetUsersIDQueryInclude(queryIncludeRaw)\n"));
        assert!(body.contains("\t\trequest.Query.Include.Set(queryIncludeValue)\n"));
        assert!(body.contains("\theaderXRequestIdRaw = strings.TrimSpace(headerXRequestIdRaw)\n"));
        assert!(body.contains("\tif err := request.Query.Validate(); err != nil {\n"));
        assert!(!body.contains("request.Path.Validate()"));
        assert!(!body.contains("checkSecurity"));
    }

    #[test]
    fn splits_requests_per_content_type() {
        let program = program(USERS);
        let body = emit(&program, "PostUsers");

        assert!(body.contains("type PostUsersApplicationJsonRequest struct {\n\tBody             PostUsersApplicationJsonRequestBody\n"));
        assert!(body.contains("type PostUsersApplicationXmlRequest struct {"));
        assert!(body.contains("\tdecodeErr := json.NewDecoder(r.Body).Decode(&request.Body)\n"));
        assert!(body.contains("\tif decodeErr != nil && !errors.Is(decodeErr, io.EOF) {\n"));
        assert!(body.contains("\tdecodeErr := xml.NewDecoder(r.Body).Decode(&request.Body)\n"));
        assert!(body.contains("\tif decodeErr == nil {\n\t\tif err := validation.Validate(request.Body); err != nil {\n"));
    }

    #[test]
    fn format_parameters_are_validated_while_parsing() {
        let program = program(
            r#"
openapi: 3.0.3
info: {title: contacts, version: "1"}
paths:
  /contacts:
    get:
      parameters:
        - name: email
          in: query
          required: true
          schema:
            type: string
            format: email
        - name: country
          in: query
          schema:
            type: string
            format: iso3166-alpha-2
      responses:
        "204":
          description: ok
"#,
        );
        let body = emit(&program, "GetContacts");

        assert!(body.contains(
            "\tqueryEmailValue := email.Email(queryEmailRaw)\n\tif err := queryEmailValue.Validate(); err != nil {\n\t\trequest.ProcessingResult = NewRequestProcessingResult(QueryParseFailed, err)\n"
        ));
        assert!(body.contains(
            "\t\tqueryCountryValue := country.Alpha2Code(queryCountryRaw)\n\t\tif err := queryCountryValue.Validate(); err != nil {\n"
        ));
        assert!(body.contains("\t\trequest.Query.Country.Set(queryCountryValue)\n"));
    }
}
