use std::fmt;

use crate::error::TemplateError;

/// Values a path template may reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    pub client_service_name: String,
    pub server_service_name: String,
}

impl PathParams {
    pub fn server(server_service_name: impl Into<String>) -> Self {
        Self {
            client_service_name: String::new(),
            server_service_name: server_service_name.into(),
        }
    }

    pub fn client(
        client_service_name: impl Into<String>,
        server_service_name: impl Into<String>,
    ) -> Self {
        Self {
            client_service_name: client_service_name.into(),
            server_service_name: server_service_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variable {
    ClientServiceName,
    ServerServiceName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(Variable),
}

/// A pre-parsed key template such as `/{{ClientServiceName}}/{{ServerServiceName}}`.
///
/// Tags may carry surrounding whitespace and a leading dot (`{{ .ServerServiceName }}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after_open = &rest[open + 2..];
            let close = after_open
                .find("}}")
                .ok_or(TemplateError::Unclosed(offset + open))?;

            let name = after_open[..close].trim();
            let name = name.strip_prefix('.').unwrap_or(name);
            let var = match name {
                "ClientServiceName" => Variable::ClientServiceName,
                "ServerServiceName" => Variable::ServerServiceName,
                other => return Err(TemplateError::UnknownVariable(other.to_string())),
            };
            segments.push(Segment::Var(var));

            let consumed = open + 2 + close + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn render(&self, params: &PathParams) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.as_str(),
                Segment::Var(Variable::ClientServiceName) => params.client_service_name.as_str(),
                Segment::Var(Variable::ServerServiceName) => params.server_service_name.as_str(),
            })
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
