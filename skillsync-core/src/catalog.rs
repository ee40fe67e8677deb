//! Compiled-in data tables: supported agents, frameworks and the sub-skill
//! detection rules. Engines take these as parameters instead of reading
//! globals, so tests can substitute their own tables.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Registry used when a project does not name one.
pub const DEFAULT_REGISTRY: &str = "https://github.com/HoangNguyen0403/agent-skills-standard";

/// Ref used when neither the category nor the repository names one.
pub const FALLBACK_REF: &str = "main";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentId {
    Cursor,
    Trae,
    Claude,
    Copilot,
    Antigravity,
    OpenAI,
    OpenCode,
    Gemini,
    Roo,
    Windsurf,
}

impl AgentId {
    pub const ALL: [AgentId; 10] = [
        AgentId::Cursor,
        AgentId::Trae,
        AgentId::Claude,
        AgentId::Copilot,
        AgentId::Antigravity,
        AgentId::OpenAI,
        AgentId::OpenCode,
        AgentId::Gemini,
        AgentId::Roo,
        AgentId::Windsurf,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgentId::Cursor => "cursor",
            AgentId::Trae => "trae",
            AgentId::Claude => "claude",
            AgentId::Copilot => "copilot",
            AgentId::Antigravity => "antigravity",
            AgentId::OpenAI => "openai",
            AgentId::OpenCode => "opencode",
            AgentId::Gemini => "gemini",
            AgentId::Roo => "roo",
            AgentId::Windsurf => "windsurf",
        }
    }

    pub fn parse(raw: &str) -> Option<AgentId> {
        AgentId::ALL.into_iter().find(|id| id.as_str() == raw)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A destination that receives materialized bundles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDefinition {
    pub id: AgentId,
    pub name: &'static str,
    /// Destination root relative to the project. `None` means the agent is
    /// known but has nowhere to write.
    pub path: Option<&'static str>,
    pub detection_files: &'static [&'static str],
}

pub const SUPPORTED_AGENTS: &[AgentDefinition] = &[
    AgentDefinition {
        id: AgentId::Cursor,
        name: "Cursor",
        path: Some(".cursor/skills"),
        detection_files: &[".cursor", ".cursorrules"],
    },
    AgentDefinition {
        id: AgentId::Trae,
        name: "Trae",
        path: Some(".trae/skills"),
        detection_files: &[".trae"],
    },
    AgentDefinition {
        id: AgentId::Claude,
        name: "Claude Code",
        path: Some(".claude/skills"),
        detection_files: &[".claude", "CLAUDE.md"],
    },
    AgentDefinition {
        id: AgentId::Copilot,
        name: "GitHub Copilot",
        path: Some(".github/skills"),
        detection_files: &[".github"],
    },
    AgentDefinition {
        id: AgentId::Antigravity,
        name: "Antigravity",
        path: Some(".agent/skills"),
        detection_files: &[".agent"],
    },
    AgentDefinition {
        id: AgentId::OpenAI,
        name: "OpenAI",
        path: Some(".codex/skills"),
        detection_files: &[".codex"],
    },
    AgentDefinition {
        id: AgentId::OpenCode,
        name: "OpenCode",
        path: Some(".opencode/skills"),
        detection_files: &[".opencode"],
    },
    AgentDefinition {
        id: AgentId::Gemini,
        name: "Gemini",
        path: Some(".gemini/skills"),
        detection_files: &[".gemini"],
    },
    AgentDefinition {
        id: AgentId::Roo,
        name: "Roo Code",
        path: Some(".roo/skills"),
        detection_files: &[".roo"],
    },
    AgentDefinition {
        id: AgentId::Windsurf,
        name: "Windsurf",
        path: Some(".windsurf/skills"),
        detection_files: &[".windsurf", ".windsurfrules"],
    },
];

pub fn agent_definition(id: AgentId) -> Option<&'static AgentDefinition> {
    SUPPORTED_AGENTS.iter().find(|a| a.id == id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub detection_files: &'static [&'static str],
    pub detection_dependencies: &'static [&'static str],
}

pub const SUPPORTED_FRAMEWORKS: &[FrameworkDefinition] = &[
    FrameworkDefinition {
        id: "flutter",
        name: "Flutter",
        detection_files: &["pubspec.yaml"],
        detection_dependencies: &[],
    },
    FrameworkDefinition {
        id: "nestjs",
        name: "NestJS",
        detection_files: &["nest-cli.json"],
        detection_dependencies: &["@nestjs/core"],
    },
    FrameworkDefinition {
        id: "golang",
        name: "Go (Golang)",
        detection_files: &["go.mod"],
        detection_dependencies: &[],
    },
    FrameworkDefinition {
        id: "nextjs",
        name: "Next.js",
        detection_files: &["next.config.js", "next.config.mjs"],
        detection_dependencies: &["next"],
    },
    FrameworkDefinition {
        id: "react",
        name: "React",
        detection_files: &[],
        detection_dependencies: &["react", "react-dom"],
    },
    FrameworkDefinition {
        id: "react-native",
        name: "React Native",
        detection_files: &["metro.config.js"],
        detection_dependencies: &["react-native"],
    },
    FrameworkDefinition {
        id: "angular",
        name: "Angular",
        detection_files: &["angular.json"],
        detection_dependencies: &[],
    },
    FrameworkDefinition {
        id: "rails",
        name: "Ruby on Rails",
        detection_files: &[
            "Gemfile",
            "config/application.rb",
            "config/environment.rb",
            "bin/rails",
        ],
        detection_dependencies: &["rails"],
    },
];

pub fn framework_definition(id: &str) -> Option<&'static FrameworkDefinition> {
    SUPPORTED_FRAMEWORKS.iter().find(|f| f.id == id)
}

/// Maps a sub-skill id to the packages whose presence means it is in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillDetection {
    pub id: String,
    pub packages: Vec<String>,
}

impl SkillDetection {
    pub fn new(id: &str, packages: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            packages: packages.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Detection rules grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionRegistry {
    rules: BTreeMap<String, Vec<SkillDetection>>,
}

impl DetectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(mut self, category: &str, rules: Vec<SkillDetection>) -> Self {
        self.rules.insert(category.to_string(), rules);
        self
    }

    pub fn rules_for(&self, category: &str) -> &[SkillDetection] {
        self.rules.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rule(&self, category: &str, skill: &str) -> Option<&SkillDetection> {
        self.rules_for(category).iter().find(|r| r.id == skill)
    }

    pub fn builtin() -> Self {
        Self::new()
            .with_rules(
                "flutter",
                vec![
                    SkillDetection::new(
                        "riverpod-state-management",
                        &["flutter_riverpod", "riverpod"],
                    ),
                    SkillDetection::new("bloc-state-management", &["flutter_bloc", "bloc"]),
                    SkillDetection::new("auto-route-navigation", &["auto_route"]),
                    SkillDetection::new("go-router-navigation", &["go_router"]),
                    SkillDetection::new("getx-navigation", &["get"]),
                    SkillDetection::new("getx-state-management", &["get"]),
                    SkillDetection::new("localization", &["easy_localization"]),
                    SkillDetection::new("retrofit-networking", &["retrofit"]),
                ],
            )
            .with_rules(
                "nestjs",
                vec![
                    SkillDetection::new("caching", &["@nestjs/cache-manager", "cache-manager"]),
                    SkillDetection::new(
                        "database",
                        &["@nestjs/typeorm", "@nestjs/prisma", "@nestjs/mongoose"],
                    ),
                    SkillDetection::new("security", &["@nestjs/passport", "passport", "helmet"]),
                ],
            )
            .with_rules(
                "android",
                vec![
                    SkillDetection::new("compose", &["androidx.compose.ui"]),
                    SkillDetection::new("navigation", &["androidx.navigation:navigation-compose"]),
                    SkillDetection::new(
                        "legacy-navigation",
                        &[
                            "androidx.navigation:navigation-fragment",
                            "androidx.navigation:navigation-ui",
                        ],
                    ),
                    SkillDetection::new("di", &["hilt-android", "dagger-android"]),
                    SkillDetection::new("persistence", &["androidx.room:room-runtime"]),
                    SkillDetection::new("networking", &["retrofit"]),
                    SkillDetection::new("concurrency", &["kotlinx-coroutines-android"]),
                ],
            )
            .with_rules(
                "ios",
                vec![
                    SkillDetection::new("networking", &["Alamofire", "Moya"]),
                    SkillDetection::new("dependency-injection", &["Swinject", "Resolver"]),
                    SkillDetection::new("persistence", &["Realm", "CoreData", "SQLite.swift"]),
                    SkillDetection::new(
                        "state-management",
                        &["ComposableArchitecture", "CombineRuntime"],
                    ),
                    SkillDetection::new("ui-navigation", &["Coordinator", "Router"]),
                ],
            )
    }
}
