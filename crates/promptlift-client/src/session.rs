//! Drives a [`Workflow`] against a [`PromptApi`].
//!
//! The workflow owns the state; the session issues the backend call for each
//! request the workflow hands out and feeds the outcome back.

use promptlift_core::{PromptRecord, SharedView, Workflow, WorkflowError};
use tracing::info;

use crate::credential::{CredentialError, CredentialStore};
use crate::http::{ApiError, PromptApi};

pub struct Session<A> {
    api: A,
    workflow: Workflow,
    credential: String,
    store: Option<CredentialStore>,
}

impl<A: PromptApi> Session<A> {
    pub fn new(api: A, workflow: Workflow) -> Self {
        Self {
            api,
            workflow,
            credential: String::new(),
            store: None,
        }
    }

    /// Persist credential edits to `store`, starting from whatever it holds.
    pub fn with_store(mut self, store: CredentialStore) -> Result<Self, CredentialError> {
        if let Some(saved) = store.load()? {
            self.credential = saved;
        }
        self.store = Some(store);
        Ok(self)
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn workflow_mut(&mut self) -> &mut Workflow {
        &mut self.workflow
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// Update the credential, writing it through to the store if one is set.
    pub fn set_credential(&mut self, credential: impl Into<String>) -> Result<(), CredentialError> {
        self.credential = credential.into();
        if let Some(store) = &self.store {
            store.save(&self.credential)?;
        }
        Ok(())
    }

    /// Use `credential` for this session only; the store is left untouched.
    pub fn use_credential(&mut self, credential: impl Into<String>) {
        self.credential = credential.into();
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.workflow.set_prompt(prompt);
    }

    pub async fn improve(&mut self) -> Result<(), WorkflowError> {
        let req = self.workflow.begin_improve(&self.credential)?;
        let outcome = self
            .api
            .improve(&req.prompt, &req.credential)
            .await
            .map(|i| i.improved_prompt);
        self.workflow.complete_improve(req.ticket, outcome);
        self.outcome()
    }

    pub async fn share(&mut self) -> Result<(), WorkflowError> {
        let req = self.workflow.begin_share()?;
        let outcome = self.api.create_share(&req.original, &req.improved).await;
        self.workflow.complete_share(req.ticket, outcome);
        self.outcome()
    }

    pub async fn publish(&mut self) -> Result<(), WorkflowError> {
        let req = self.workflow.begin_publish()?;
        let outcome = self.api.publish(&req.share_id).await;
        self.workflow.complete_publish(req.ticket, outcome);
        self.outcome()
    }

    /// Load a shared record for the viewer.
    pub async fn open_shared(&self, share_id: &str) -> Result<SharedView, ApiError> {
        let record = self.api.fetch_shared(share_id).await?;
        info!(share_id, "opened shared prompt");
        Ok(SharedView::from_record(record))
    }

    pub async fn gallery(&self) -> Result<Vec<PromptRecord>, ApiError> {
        self.api.list_gallery().await
    }

    fn outcome(&self) -> Result<(), WorkflowError> {
        match self.workflow.error() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
