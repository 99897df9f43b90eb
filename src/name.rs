//! Deterministic mapping of OpenAPI identifiers to exported target identifiers.

const SEPARATORS: &[char] = &[
    '-', '#', '@', '!', '$', '&', '=', '.', '+', ':', ';', '_', '~', ' ', '(', ')', '{', '}', '[',
    ']', ',',
];

/// Strips separators, upper-cases the first letter of every segment and
/// rewrites a trailing `uuid`/`id` to `UUID`/`ID`.
pub fn normalise(s: &str) -> String {
    let mut name = String::with_capacity(s.len());
    for segment in s.split(SEPARATORS).filter(|segment| !segment.is_empty()) {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
    }

    if let Some(prefix) = strip_suffix_ignore_case(&name, "uuid") {
        name = format!("{prefix}UUID");
    }
    if let Some(prefix) = strip_suffix_ignore_case(&name, "id") {
        name = format!("{prefix}ID");
    }
    name
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    if s.len() < suffix.len() {
        return None;
    }
    let split = s.len() - suffix.len();
    if !s.is_char_boundary(split) {
        return None;
    }
    let (prefix, tail) = s.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(prefix)
}

/// [`normalise`] with an `X` prefix when the result would start with a digit.
pub fn exported(s: &str) -> String {
    let name = normalise(s);
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("X{name}")
    } else {
        name
    }
}

/// `normalise(lowercase(method) + path)` with `/` treated as a separator.
pub fn normalise_operation(path: &str, method: &str) -> String {
    let raw = format!("{}{}", method.to_lowercase(), path).replace('/', "-");
    normalise(&raw)
}

/// `application/json` -> `ApplicationJson`. Media type parameters are ignored.
pub fn content_type_tag(content_type: &str) -> String {
    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    media_type
        .split('/')
        .map(|segment| {
            let lower = segment.to_lowercase();
            let mut chars = lower.chars();
            let titled = match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            };
            normalise(&titled)
        })
        .collect()
}

/// Last path component of a `$ref`, normalised.
pub fn ref_local_name(ref_: &str) -> String {
    normalise(ref_.rsplit('/').next().unwrap_or(ref_))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strips_separators_and_capitalises_segments() {
        assert_eq!(normalise("transaction-create"), "TransactionCreate");
        assert_eq!(normalise("snake_case_name"), "SnakeCaseName");
        assert_eq!(normalise("dotted.name+plus"), "DottedNamePlus");
        assert_eq!(normalise("with space(and){braces}[x]"), "WithSpaceAndBracesX");
        assert_eq!(normalise("keepsCamelCase2"), "KeepsCamelCase2");
        assert_eq!(normalise(""), "");
        assert_eq!(normalise("---"), "");
    }

    #[test]
    fn rewrites_identifier_suffixes() {
        assert_eq!(normalise("user_id"), "UserID");
        assert_eq!(normalise("userId"), "UserID");
        assert_eq!(normalise("request-uuid"), "RequestUUID");
        assert_eq!(normalise("requestUuid"), "RequestUUID");
        assert_eq!(normalise("id"), "ID");
        assert_eq!(normalise("uuid"), "UUID");
    }

    #[test]
    fn is_idempotent() {
        for input in [
            "user_id",
            "request-uuid",
            "get-users-{id}",
            "application/json",
            "Paid",
            "a.b.c",
            "ÄpfelId",
        ] {
            let once = normalise(input);
            assert_eq!(normalise(&once), once, "input `{input}`");
        }
    }

    #[test]
    fn exported_names_never_start_with_a_digit() {
        assert_eq!(exported("3ds"), "X3ds");
        assert_eq!(exported("3d_secure"), "X3dSecure");
        assert_eq!(exported("amount"), "Amount");
    }

    #[test]
    fn operation_names() {
        assert_eq!(normalise_operation("/transaction", "POST"), "PostTransaction");
        assert_eq!(normalise_operation("/users/{id}", "get"), "GetUsersID");
        assert_eq!(
            normalise_operation("/users/{userId}/posts", "Delete"),
            "DeleteUsersUserIdPosts"
        );
        assert_eq!(normalise_operation("/", "get"), "Get");
    }

    #[test]
    fn content_type_tags() {
        assert_eq!(content_type_tag("application/json"), "ApplicationJson");
        assert_eq!(content_type_tag("application/xml"), "ApplicationXml");
        assert_eq!(content_type_tag("APPLICATION/OCTET-STREAM"), "ApplicationOctetStream");
        assert_eq!(content_type_tag("application/vnd.api+json"), "ApplicationVndApiJson");
        assert_eq!(content_type_tag("text/plain; charset=utf-8"), "TextPlain");
    }

    #[test]
    fn reference_names() {
        assert_eq!(ref_local_name("#/components/schemas/transaction_create"), "TransactionCreate");
        assert_eq!(ref_local_name("Plain"), "Plain");
    }
}
