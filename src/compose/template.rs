//! Dockerfile templates for development environments
//!
//! Every template defines a `development` stage, the default build target.

use std::fmt;
use std::str::FromStr;

/// Dockerfile template choice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DockerfileTemplate {
    /// Use the Dockerfile already in the directory
    #[default]
    None,
    NextJs,
    NestJs,
    Laravel,
}

impl DockerfileTemplate {
    /// All templates, in menu order
    pub const ALL: [DockerfileTemplate; 4] = [
        DockerfileTemplate::None,
        DockerfileTemplate::NextJs,
        DockerfileTemplate::NestJs,
        DockerfileTemplate::Laravel,
    ];

    /// Label shown in forms
    pub fn label(&self) -> &'static str {
        match self {
            DockerfileTemplate::None => "(none)",
            DockerfileTemplate::NextJs => "Next.js",
            DockerfileTemplate::NestJs => "Nest.js",
            DockerfileTemplate::Laravel => "Laravel",
        }
    }

    /// Look a template up by its form label
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, DockerfileTemplate::None)
    }

    /// Dockerfile contents
    pub fn contents(&self) -> &'static str {
        match self {
            DockerfileTemplate::None => "",
            DockerfileTemplate::NextJs => NEXTJS,
            DockerfileTemplate::NestJs => NESTJS,
            DockerfileTemplate::Laravel => LARAVEL,
        }
    }
}

impl fmt::Display for DockerfileTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DockerfileTemplate::None => write!(f, "none"),
            DockerfileTemplate::NextJs => write!(f, "nextjs"),
            DockerfileTemplate::NestJs => write!(f, "nestjs"),
            DockerfileTemplate::Laravel => write!(f, "laravel"),
        }
    }
}

impl FromStr for DockerfileTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "(none)" | "" => Ok(DockerfileTemplate::None),
            "nextjs" | "next.js" | "next" => Ok(DockerfileTemplate::NextJs),
            "nestjs" | "nest.js" | "nest" => Ok(DockerfileTemplate::NestJs),
            "laravel" => Ok(DockerfileTemplate::Laravel),
            other => Err(format!(
                "unknown template '{}' (expected none, nextjs, nestjs or laravel)",
                other
            )),
        }
    }
}

const NEXTJS: &str = r#"FROM node:20-alpine AS base
WORKDIR /app
COPY package*.json ./

FROM base AS development
RUN npm install
COPY . .
ENV NODE_ENV=development
EXPOSE 3000
CMD ["npm", "run", "dev"]

FROM base AS production
RUN npm ci
COPY . .
RUN npm run build
ENV NODE_ENV=production
EXPOSE 3000
CMD ["npm", "start"]
"#;

const NESTJS: &str = r#"FROM node:20-alpine AS base
WORKDIR /app
COPY package*.json ./

FROM base AS development
RUN npm install
COPY . .
ENV NODE_ENV=development
EXPOSE 3000
CMD ["npm", "run", "start:dev"]

FROM base AS production
RUN npm ci
COPY . .
RUN npm run build
ENV NODE_ENV=production
EXPOSE 3000
CMD ["node", "dist/main"]
"#;

const LARAVEL: &str = r#"FROM php:8.3-cli AS base
RUN apt-get update \
    && apt-get install -y --no-install-recommends git unzip libzip-dev \
    && docker-php-ext-install pdo_mysql zip \
    && rm -rf /var/lib/apt/lists/*
COPY --from=composer:2 /usr/bin/composer /usr/bin/composer
WORKDIR /app

FROM base AS development
COPY . .
RUN composer install
EXPOSE 8000
CMD ["php", "artisan", "serve", "--host=0.0.0.0", "--port=8000"]

FROM base AS production
COPY . .
RUN composer install --no-dev --optimize-autoloader
EXPOSE 8000
CMD ["php", "artisan", "serve", "--host=0.0.0.0", "--port=8000"]
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_template_has_development_stage() {
        for template in DockerfileTemplate::ALL {
            if template.is_none() {
                assert!(template.contents().is_empty());
            } else {
                assert!(template.contents().contains(" AS development"));
            }
        }
    }

    #[test]
    fn test_parse_names_and_labels() {
        for template in DockerfileTemplate::ALL {
            assert_eq!(template.to_string().parse::<DockerfileTemplate>(), Ok(template));
            assert_eq!(DockerfileTemplate::from_label(template.label()), Some(template));
        }
        assert!("rails".parse::<DockerfileTemplate>().is_err());
    }
}
