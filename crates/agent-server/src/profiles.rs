//! JSON-file agent profile store
//!
//! All profiles live in one JSON array. Every operation takes the store lock,
//! reads the file, and (for mutations) writes it back through a temp file, so
//! concurrent requests in this process cannot lose each other's updates.

use std::path::PathBuf;

use agent_core::AgentProfile;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("profile store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProfileError>;

/// Body of a create request
#[derive(Debug, Deserialize)]
pub struct NewAgent {
    pub name: String,
    #[serde(alias = "system_prompt", default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Body of an update request; absent fields are left alone
#[derive(Debug, Default, Deserialize)]
pub struct AgentPatch {
    pub name: Option<String>,
    #[serde(alias = "system_prompt")]
    pub instructions: Option<String>,
    pub tools: Option<Vec<String>>,
    pub temperature: Option<f32>,
    pub model: Option<String>,
}

impl AgentPatch {
    fn apply(self, profile: &mut AgentProfile) {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(instructions) = self.instructions {
            profile.instructions = instructions;
        }
        if let Some(tools) = self.tools {
            profile.tools = tools;
        }
        if let Some(temperature) = self.temperature {
            profile.temperature = temperature;
        }
        if let Some(model) = self.model {
            profile.model = Some(model).filter(|m| !m.trim().is_empty());
        }
    }
}

pub struct ProfileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ProfileStore {
    /// Open the store at `path`, seeding default profiles when the file is
    /// missing, empty, or holds no profiles.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            path: path.into(),
            lock: Mutex::new(()),
        };
        {
            let _guard = store.lock.lock().await;
            store.load().await?;
        }
        Ok(store)
    }

    pub async fn list(&self) -> Result<Vec<AgentProfile>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    pub async fn get(&self, id: &str) -> Result<Option<AgentProfile>> {
        Ok(self.list().await?.into_iter().find(|p| p.id == id))
    }

    pub async fn create(&self, new: NewAgent) -> Result<AgentProfile> {
        let _guard = self.lock.lock().await;
        let mut profiles = self.load().await?;

        let mut profile = AgentProfile::new(
            uuid::Uuid::new_v4().to_string(),
            new.instructions.unwrap_or_else(|| "You are a helpful assistant.".into()),
        )
        .with_tools(new.tools);
        profile.name = new.name;
        if let Some(temperature) = new.temperature {
            profile.temperature = temperature;
        }
        profile.model = new.model.filter(|m| !m.trim().is_empty());

        profiles.push(profile.clone());
        self.save(&profiles).await?;
        tracing::info!(agent = %profile.id, name = %profile.name, "agent created");
        Ok(profile)
    }

    pub async fn update(&self, id: &str, patch: AgentPatch) -> Result<Option<AgentProfile>> {
        self.modify(id, |profile| patch.apply(profile)).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut profiles = self.load().await?;
        let before = profiles.len();
        profiles.retain(|p| p.id != id);
        if profiles.len() == before {
            return Ok(false);
        }
        self.save(&profiles).await?;
        Ok(true)
    }

    /// Declare `tool` on the agent if it is not declared yet
    pub async fn add_tool(&self, id: &str, tool: &str) -> Result<Option<AgentProfile>> {
        self.modify(id, |profile| {
            if profile.add_tool(tool) {
                tracing::info!(agent = %profile.id, tool, "tool added to agent");
            }
        })
        .await
    }

    async fn modify<F>(&self, id: &str, change: F) -> Result<Option<AgentProfile>>
    where
        F: FnOnce(&mut AgentProfile),
    {
        let _guard = self.lock.lock().await;
        let mut profiles = self.load().await?;
        let Some(profile) = profiles.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        change(profile);
        let updated = profile.clone();
        self.save(&profiles).await?;
        Ok(Some(updated))
    }

    /// Caller holds the lock
    async fn load(&self) -> Result<Vec<AgentProfile>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let existing = if raw.trim().is_empty() {
            Vec::new()
        } else {
            match serde_json::from_str::<Vec<AgentProfile>>(&raw) {
                Ok(profiles) => profiles,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "unreadable profile store, reseeding");
                    Vec::new()
                }
            }
        };

        if !existing.is_empty() {
            return Ok(existing);
        }

        let seeded = default_profiles();
        self.save(&seeded).await?;
        tracing::info!(path = %self.path.display(), count = seeded.len(), "seeded default agents");
        Ok(seeded)
    }

    /// Caller holds the lock
    async fn save(&self, profiles: &[AgentProfile]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(profiles)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn seed(name: &str, instructions: &str, tools: &[&str], temperature: f32) -> AgentProfile {
    let mut profile = AgentProfile::new(uuid::Uuid::new_v4().to_string(), instructions)
        .with_tools(tools.iter().copied());
    profile.name = name.into();
    profile.temperature = temperature;
    profile
}

fn default_profiles() -> Vec<AgentProfile> {
    vec![
        seed(
            "Travel",
            "You are a world-class travel planner. Be concise, structured, and pragmatic. \
             When suggesting itineraries, include timings, logistics, and price hints. \
             Use tools if available.",
            &["web_search", "calculator"],
            0.3,
        ),
        seed(
            "Code Helper",
            "You are a senior Rust developer. Explain step-by-step, show short code snippets, \
             and warn about edge cases. Keep answers focused.",
            &["web_search"],
            0.2,
        ),
        seed(
            "Research Assistant",
            "You are a research assistant. Ground answers in the uploaded documents when they \
             are relevant and cite snippets as [n].",
            &["web_search", "kb_search"],
            0.2,
        ),
        seed(
            "English Tutor",
            "You are a patient English tutor. Use simple language and provide two examples \
             for each concept.",
            &[],
            0.2,
        ),
    ]
}
