use crate::error::Result;
use crate::v3::codegen::backend::go::builders::response_interface;
use crate::v3::codegen::backend::go::operations::{request_variants, ResultNames};
use crate::v3::codegen::backend::go::{comment, format_var_name, quote, runtime, Context, CHI};
use crate::v3::codegen::ir::Operation;
use crate::v3::codegen::sink::Sink;

use log::{debug, trace};

/// Hook fields and their Go signatures; `$RESULT` is the processing result type.
const HOOKS: &[(&str, &str)] = &[
    ("RequestSecurityParseFailed", "func(r *http.Request, operation string, scheme string, result $RESULT)"),
    ("RequestSecurityParseCompleted", "func(r *http.Request, operation string)"),
    ("RequestSecurityCheckFailed", "func(r *http.Request, operation string, scheme string, result $RESULT)"),
    ("RequestSecurityCheckCompleted", "func(r *http.Request, operation string)"),
    ("RequestPathParseFailed", "func(r *http.Request, operation string, param string, result $RESULT)"),
    ("RequestPathParseCompleted", "func(r *http.Request, operation string)"),
    ("RequestPathValidationFailed", "func(r *http.Request, operation string, result $RESULT)"),
    ("RequestQueryParseFailed", "func(r *http.Request, operation string, param string, result $RESULT)"),
    ("RequestQueryParseCompleted", "func(r *http.Request, operation string)"),
    ("RequestQueryValidationFailed", "func(r *http.Request, operation string, result $RESULT)"),
    ("RequestHeaderParseFailed", "func(r *http.Request, operation string, param string, result $RESULT)"),
    ("RequestHeaderParseCompleted", "func(r *http.Request, operation string)"),
    ("RequestHeaderValidationFailed", "func(r *http.Request, operation string, result $RESULT)"),
    ("RequestBodyUnmarshalFailed", "func(r *http.Request, operation string, result $RESULT)"),
    ("RequestBodyUnmarshalCompleted", "func(r *http.Request, operation string)"),
    ("RequestBodyValidationFailed", "func(r *http.Request, operation string, result $RESULT)"),
    ("RequestParseCompleted", "func(r *http.Request, operation string)"),
    ("RequestRedirectStarted", "func(r *http.Request, operation string, target string)"),
    ("ServiceCompleted", "func(r *http.Request, operation string)"),
    ("ResponseBodyMarshalCompleted", "func(r *http.Request, operation string)"),
    ("ResponseBodyMarshalFailed", "func(w http.ResponseWriter, r *http.Request, operation string, err error)"),
    ("ResponseBodyWriteCompleted", "func(r *http.Request, operation string, status int)"),
    ("ResponseBodyWriteFailed", "func(r *http.Request, operation string, status int, err error)"),
    ("RequestProcessingCompleted", "func(r *http.Request, operation string)"),
];

/// chi registration method for an HTTP method.
fn chi_method(method: &str) -> String {
    let lower = method.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn handler(operation: &Operation) -> String {
    format_var_name(&format!("Handle{}", operation.name))
}

fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

impl Context<'_> {
    pub(super) fn emit_router(&self, sink: &mut Sink) -> Result<()> {
        runtime::router(sink)?;
        self.emit_hooks(sink)?;
        self.emit_security(sink)?;

        for operation in &self.program.operations {
            self.emit_request(sink, operation)?;
            self.emit_response(sink, operation)?;
        }

        let tags = self.program.tags();
        debug!("emitting {} services", tags.len());
        for (tag, operations) in &tags {
            self.emit_service(sink, tag, operations)?;
        }

        sink.declare("OpenAPISpec", "document")?;
        sink.blank();
        sink.line("// OpenAPISpec is the source document, keys sorted, as JSON.");
        sink.line(format!(
            "var OpenAPISpec = []byte({})",
            quote(&self.program.spec_json)
        ));
        Ok(())
    }

    fn emit_hooks(&self, sink: &mut Sink) -> Result<()> {
        sink.declare("Hooks", "hooks")?;
        let names = ResultNames::new(self, sink);
        let rows: Vec<_> = HOOKS
            .iter()
            .map(|(name, signature)| {
                vec![name.to_string(), signature.replace("$RESULT", &names.result)]
            })
            .collect();
        sink.blank();
        sink.line("// Hooks observe request processing. Nil hooks are skipped.");
        sink.block("type Hooks struct", |s| s.rows(&rows));
        Ok(())
    }

    fn emit_service(&self, sink: &mut Sink, tag: &str, operations: &[&Operation]) -> Result<()> {
        let service = format!("{tag}Service");
        let router = format!("{tag}Router");
        let constructor = format!("New{tag}Router");
        let owner = format!("tag {tag}");
        for name in [&service, &router, &constructor] {
            sink.declare(name, &owner)?;
        }
        trace!("emitting service `{service}` with {} operations", operations.len());

        let context = sink.qual("context", "Context");
        let mux = sink.qual(CHI, "Mux");
        let new_router = sink.qual(CHI, "NewRouter");

        sink.blank();
        comment(sink, &service, Some(&format!("handles the operations tagged {tag}.")));
        sink.block(format!("type {service} interface"), |s| {
            for operation in operations {
                comment(s, &operation.name, operation.summary.as_deref());
                for variant in request_variants(operation) {
                    s.line(format!(
                        "{}(ctx {context}, request {}) {}",
                        variant.method,
                        variant.type_name,
                        response_interface(operation)
                    ));
                }
            }
        });

        sink.blank();
        sink.block(format!("type {router} struct"), |s| {
            s.rows(&[
                vec!["router".into(), format!("*{mux}")],
                vec!["service".into(), service.clone()],
                vec!["hooks".into(), "*Hooks".into()],
                vec!["processors".into(), "[]securityProcessor".into()],
            ])
        });

        sink.blank();
        sink.line(format!(
            "// {constructor} mounts the {tag} operations on mux, or on a new router when mux is nil."
        ));
        sink.block(
            format!(
                "func {constructor}(mux *{mux}, service {service}, hooks *Hooks, schemas SecuritySchemas, processors ...securityProcessor) http.Handler"
            ),
            |s| {
                s.block("if mux == nil", |s| s.line(format!("mux = {new_router}()")));
                s.block("if hooks == nil", |s| s.line("hooks = &Hooks{}"));
                s.line(format!("router := &{router}{{"));
                s.indent();
                s.rows(&[
                    vec!["router:".into(), "mux,".into()],
                    vec!["service:".into(), "service,".into()],
                    vec!["hooks:".into(), "hooks,".into()],
                    vec![
                        "processors:".into(),
                        "append(append([]securityProcessor{}, processors...), securityProcessors(schemas)...),"
                            .into(),
                    ],
                ]);
                s.dedent();
                s.line("}");
                s.line("router.mount()");
                s.line("return router");
            },
        );

        sink.blank();
        sink.block(
            format!("func (router *{router}) ServeHTTP(w http.ResponseWriter, r *http.Request)"),
            |s| s.line("router.router.ServeHTTP(w, r)"),
        );

        sink.blank();
        sink.block(format!("func (router *{router}) mount()"), |s| {
            for operation in operations {
                let method = chi_method(&operation.method);
                let path = &operation.path;
                s.line(format!(
                    "router.router.{method}({}, router.{})",
                    quote(path),
                    handler(operation)
                ));
                if path != "/" && !path.ends_with('/') {
                    s.line(format!(
                        "router.router.{method}({}, redirectHandler(router.hooks, {}))",
                        quote(&format!("{path}/")),
                        quote(&operation.name)
                    ));
                }
            }
        });

        for operation in operations {
            self.emit_handler(sink, &router, operation)?;
        }
        Ok(())
    }

    fn emit_handler(&self, sink: &mut Sink, router: &str, operation: &Operation) -> Result<()> {
        let name = handler(operation);
        sink.declare(&format!("{router}.{name}"), &format!("operation {}", operation.name))?;
        let op = quote(&operation.name);
        let variants = request_variants(operation);
        let interface = response_interface(operation);
        let parse_media = (variants.len() > 1).then(|| sink.qual("mime", "ParseMediaType"));

        sink.blank();
        sink.block(
            format!("func (router *{router}) {name}(w http.ResponseWriter, r *http.Request)"),
            |s| {
                match (&parse_media, variants.as_slice()) {
                    (None, [variant]) => {
                        s.line(format!(
                            "request := {}(r, router.hooks, router.processors)",
                            variant.parser
                        ));
                        s.line(format!(
                            "response := router.service.{}(r.Context(), request)",
                            variant.method
                        ));
                    }
                    (parse_media, variants) => {
                        let parse_media = parse_media.as_deref().unwrap_or("mime.ParseMediaType");
                        s.line(format!(
                            "mediaType, _, _ := {parse_media}(r.Header.Get(\"Content-Type\"))"
                        ));
                        s.line(format!("var response {interface}"));
                        s.line("switch mediaType {");
                        for variant in variants {
                            let content_type = variant
                                .content
                                .map(|content| media_type(&content.content_type))
                                .unwrap_or_default();
                            s.line(format!("case {}:", quote(&content_type)));
                            s.indent();
                            s.line(format!(
                                "response = router.service.{}(r.Context(), {}(r, router.hooks, router.processors))",
                                variant.method, variant.parser
                            ));
                            s.dedent();
                        }
                        s.line("default:");
                        s.indent();
                        s.line("w.WriteHeader(http.StatusUnsupportedMediaType)");
                        s.line("return");
                        s.dedent();
                        s.line("}");
                    }
                }
                s.block("if router.hooks.ServiceCompleted != nil", |s| {
                    s.line(format!("router.hooks.ServiceCompleted(r, {op})"))
                });
                s.line(format!("writeResponse(w, r, router.hooks, {op}, response)"));
                s.block("if router.hooks.RequestProcessingCompleted != nil", |s| {
                    s.line(format!("router.hooks.RequestProcessingCompleted(r, {op})"))
                });
            },
        );
        Ok(())
    }
}
