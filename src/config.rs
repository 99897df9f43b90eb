use std::path::PathBuf;

pub const ROUTER_FILE_NAME: &str = "router.go";
pub const COMPONENTS_FILE_NAME: &str = "components.go";

/// Run configuration of the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub swagger_addr: String,
    pub package: String,
    pub path: PathBuf,
    pub components_package: Option<String>,
    pub components_path: Option<PathBuf>,
}

impl Config {
    pub fn new(package: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            swagger_addr: "swagger.yaml".into(),
            package: package.into(),
            path: path.into(),
            components_package: None,
            components_path: None,
        }
    }

    pub fn with_components(
        mut self,
        components_package: impl Into<String>,
        components_path: impl Into<PathBuf>,
    ) -> Self {
        self.components_package = Some(components_package.into());
        self.components_path = Some(components_path.into());
        self
    }

    /// Package clause of the router artifact.
    pub fn router_package_name(&self) -> String {
        package_name(&self.package)
    }

    /// Package clause of the components artifact.
    pub fn components_package_name(&self) -> String {
        package_name(self.components_package.as_deref().unwrap_or(&self.package))
    }

    /// Import path of the components package when it differs from the router package.
    pub fn components_import_path(&self) -> Option<&str> {
        self.components_package
            .as_deref()
            .filter(|components| *components != self.package)
    }

    pub fn router_file(&self) -> PathBuf {
        self.path.join(ROUTER_FILE_NAME)
    }

    pub fn components_file(&self) -> PathBuf {
        self.components_path
            .as_deref()
            .unwrap_or(&self.path)
            .join(COMPONENTS_FILE_NAME)
    }
}

/// Last `/` segment of a package path, reduced to a valid package clause.
pub fn package_name(package: &str) -> String {
    let last = package
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(package);
    let name: String = last
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_lowercase();
    if name.is_empty() {
        "generated".into()
    } else {
        name
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn components_default_to_router_package() {
        let config = Config::new("api", "out/api");
        assert_eq!(config.router_package_name(), "api");
        assert_eq!(config.components_package_name(), "api");
        assert_eq!(config.components_import_path(), None);
        assert_eq!(config.router_file(), PathBuf::from("out/api/router.go"));
        assert_eq!(config.components_file(), PathBuf::from("out/api/components.go"));
    }

    #[test]
    fn separate_components_package() {
        let config = Config::new("api", "out/api")
            .with_components("github.com/acme/shop/components", "out/components");
        assert_eq!(config.components_package_name(), "components");
        assert_eq!(
            config.components_import_path(),
            Some("github.com/acme/shop/components")
        );
        assert_eq!(
            config.components_file(),
            PathBuf::from("out/components/components.go")
        );
    }

    #[test]
    fn package_names_are_sanitised() {
        assert_eq!(package_name("github.com/acme/go-api/"), "goapi");
        assert_eq!(package_name("Router"), "router");
        assert_eq!(package_name("---"), "generated");
    }
}
