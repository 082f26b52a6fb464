//! Environment orchestration — the coordinator composing file storage,
//! conversation state, and the model gateway.
//!
//! Every public operation serializes on a per-environment lock: operations
//! against different environments run concurrently, operations within one
//! environment never interleave. Two concurrent dispatches against the same
//! id racing on `tokens` and `messages` would corrupt the accounting, so the
//! lock is held for the duration of every call.
//!
//! All collaborators are injected at construction; the orchestrator holds no
//! global state.

use envhub_core::error::{Error, Result, StorageError};
use envhub_core::file::{FileContent, FileRecord};
use envhub_core::gateway::ModelGateway;
use envhub_core::message::Message;
use envhub_core::store::FileStore;
use envhub_conversation::ConversationStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Prompt used by `generate` when the caller supplies no instructions.
pub const GENERATE_PROMPT: &str =
    "Based on the files you previously got find similarities and generate a response.";

/// Prompt prefix used by `generate` when the caller supplies instructions.
pub const GENERATE_INSTRUCTED_PROMPT: &str =
    "Based on the files you previously got generate a response according to these instructions: ";

/// The core coordinator for environment lifecycle, file mutation, context
/// commit, and prompt dispatch.
pub struct EnvironmentOrchestrator {
    files: Arc<dyn FileStore>,
    conversations: Arc<ConversationStore>,
    gateway: Arc<dyn ModelGateway>,
    token_limit: u64,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl EnvironmentOrchestrator {
    pub fn new(
        files: Arc<dyn FileStore>,
        conversations: Arc<ConversationStore>,
        gateway: Arc<dyn ModelGateway>,
        token_limit: u64,
    ) -> Self {
        Self {
            files,
            conversations,
            gateway,
            token_limit,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The lock guarding all operations on one environment id.
    async fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(id.to_string()).or_default().clone()
    }

    // --- Environment lifecycle ---

    /// Initialize the environment's file namespace and conversation.
    pub async fn create_environment(&self, id: &str) -> Result<()> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        self.files.make_dir(id).await?;
        self.conversations.create(id, vec![], vec![]).await;
        info!(id, "Environment created");
        Ok(())
    }

    /// Tear down the file namespace and conversation in lockstep.
    ///
    /// The per-id lock entry is kept: dropping it would hand a fresh mutex to
    /// the next `lock_for` while operations queued on the old one are still
    /// pending, letting two operations on the same id interleave.
    pub async fn remove_environment(&self, id: &str) -> Result<()> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        self.files.remove_dir(id).await?;
        self.conversations.close(id).await;
        info!(id, "Environment removed");
        Ok(())
    }

    /// Clear the environment's files and reset its conversation, keeping
    /// both addressable.
    pub async fn clear_environment(&self, id: &str) -> Result<()> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        self.files.clear_dir(id).await?;
        self.conversations.clear(id).await;
        info!(id, "Environment cleared");
        Ok(())
    }

    // --- Files ---

    /// Save a file, replacing any existing file with the same name.
    pub async fn save_file(&self, id: &str, content: FileContent, name: &str) -> Result<()> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        if self.files.exists(id, name).await? {
            self.files.remove(id, name).await?;
        }
        self.files.write(id, name, content).await?;
        debug!(id, name, "File saved");
        Ok(())
    }

    /// Write a file, creating it if absent and overwriting otherwise.
    pub async fn update_file(&self, id: &str, content: FileContent, name: &str) -> Result<()> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        self.files.write(id, name, content).await?;
        debug!(id, name, "File updated");
        Ok(())
    }

    /// Remove a file. A missing file counts as already removed — outwardly
    /// idempotent; every other storage failure propagates.
    pub async fn remove_file(&self, id: &str, name: &str) -> Result<()> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        match self.files.remove(id, name).await {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound { .. }) => {
                debug!(id, name, "Remove of missing file treated as success");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read a file's content. A missing file is a user-visible error.
    pub async fn read_file(&self, id: &str, name: &str) -> Result<String> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        Ok(self.files.read(id, name).await?)
    }

    /// List the environment's files (extension-filtered, stat-ed).
    pub async fn list_files(&self, id: &str) -> Result<Vec<FileRecord>> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        Ok(self.files.list_files(id).await?)
    }

    // --- Conversation ---

    /// Load the environment's current file contents into the conversation as
    /// system messages, overwriting any prior conversation.
    pub async fn commit_files(&self, id: &str) -> Result<()> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        self.commit_files_locked(id).await
    }

    async fn commit_files_locked(&self, id: &str) -> Result<()> {
        let file_messages = self.file_context(id).await?;
        info!(id, files = file_messages.len(), "Committing files to conversation");
        self.conversations.create(id, file_messages, vec![]).await;
        Ok(())
    }

    /// One system message per stored file, carrying its content.
    async fn file_context(&self, id: &str) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        for record in self.files.list_files(id).await? {
            let content = self.files.read(id, &record.filename).await?;
            messages.push(Message::file_context(&record.filename, &content));
        }
        Ok(messages)
    }

    /// Generate text from the environment's files, committing them first if
    /// needed. An empty prompt uses the plain generate template; otherwise
    /// the instructed template is prefixed to the caller's prompt.
    pub async fn generate(&self, id: &str, prompt: &str) -> Result<String> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        if !self.conversations.get(id).await.committed {
            self.commit_files_locked(id).await?;
        }

        let composed = if prompt.is_empty() {
            GENERATE_PROMPT.to_string()
        } else {
            format!("{GENERATE_INSTRUCTED_PROMPT}{prompt}")
        };

        self.dispatch(id, &composed).await
    }

    /// Send a prompt to the model verbatim.
    pub async fn send_prompt(&self, id: &str, prompt: &str) -> Result<String> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        self.dispatch(id, prompt).await
    }

    /// The user-visible transcript: the conversation minus system messages.
    pub async fn get_chat_context(&self, id: &str) -> Result<Vec<Message>> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        Ok(self.conversations.get(id).await.transcript())
    }

    /// Reset the conversation to the default prompt, leaving files alone.
    pub async fn clear_chat_context(&self, id: &str) -> Result<()> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        self.conversations.clear(id).await;
        Ok(())
    }

    /// Core dispatch: budget check, append user message, call the gateway,
    /// account tokens, append the reply.
    ///
    /// The limit is enforced on state prior to this call, not a moving
    /// target. On gateway failure the appended user message remains in the
    /// log.
    async fn dispatch(&self, id: &str, prompt: &str) -> Result<String> {
        let conversation = self.conversations.get(id).await;
        if conversation.tokens > self.token_limit {
            return Err(Error::TokenLimitExceeded {
                used: conversation.tokens,
                limit: self.token_limit,
            });
        }

        self.conversations.push(id, Message::user(prompt)).await;
        let history = self.conversations.get(id).await.messages;

        let reply = self.gateway.complete(&history).await?;

        self.conversations.add_tokens(id, reply.total_tokens).await;
        self.conversations
            .push(id, Message::assistant(&reply.content))
            .await;

        debug!(id, used = reply.total_tokens, "Prompt dispatched");
        Ok(reply.content)
    }
}
