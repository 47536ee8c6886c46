// SPDX-License-Identifier: MIT

//! Birthdate pipeline: look up a person's birthdate, then compute the age
//!
//! `START -> step_one -> step_two -> END`

use async_trait::async_trait;
use std::sync::Arc;

use crate::adk::agent::{Agent, ReActAgent};
use crate::adk::error::{GraphError, Result};
use crate::adk::model::{Content, Model};
use crate::adk::tool::ToolSpec;
use crate::stepwise::tools::age::DATE_FORMAT;
use crate::stepwise::tools::CalculateAgeTool;
use crate::stepwise::workflow::graph::{Node, Workflow, WorkflowBuilder, END, START};
use crate::stepwise::workflow::state::{FieldType, State, StateSchema, StateUpdate};

/// Model calls the age agent may make per request
pub const AGE_AGENT_MAX_ITERATIONS: usize = 5;

pub fn schema() -> StateSchema {
    StateSchema::new()
        .field("name", FieldType::String)
        .field("birthdate", FieldType::String)
        .field("age", FieldType::String)
}

/// Asks the model for the birthdate of `name`
pub struct StepOne {
    model: Arc<dyn Model>,
}

impl StepOne {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Node for StepOne {
    async fn run(&self, state: &State) -> Result<StateUpdate> {
        let name = state.require_str("name")?;
        log::info!("Doing step one for {}", name);

        let prompt = format!(
            "Find the birthdate of {} in format {}, e.g. 1978-10-29. Return only the date.",
            name, DATE_FORMAT
        );
        let message = self
            .model
            .generate_content(&[Content::user(prompt)], None, &[])
            .await?;
        let birthdate = message.text().trim().to_string();

        log::info!("Found date: {}", birthdate);
        Ok(StateUpdate::new().set("birthdate", birthdate))
    }
}

/// Runs an agent equipped with `calculate_age` on the birthdate
pub struct StepTwo {
    agent: ReActAgent,
    age_tool: CalculateAgeTool,
}

impl StepTwo {
    pub fn new(
        model: Arc<dyn Model>,
        age_tool: CalculateAgeTool,
    ) -> std::result::Result<Self, GraphError> {
        let agent = ReActAgent::new(
            "age_agent",
            "",
            model,
            vec![ToolSpec::local(Arc::new(age_tool.clone()))],
            AGE_AGENT_MAX_ITERATIONS,
        )?;
        Ok(Self { agent, age_tool })
    }

    fn prompt(&self, birthdate: &str) -> String {
        format!(
            "Calculate the age based on the birthdate.\n\
             Use a tool to calculate (because current date is {}) and return only the result!\n\
             Birthdate: {}\n\
             Age: ",
            self.age_tool.today(),
            birthdate
        )
    }
}

#[async_trait]
impl Node for StepTwo {
    async fn run(&self, state: &State) -> Result<StateUpdate> {
        let birthdate = state.require_str("birthdate")?;
        log::info!("Doing step two for birthdate {}", birthdate);

        let age = self.agent.run(self.prompt(birthdate)).await?;
        let age = age.trim().to_string();
        log::info!("Age: {}", age);
        Ok(StateUpdate::new().set("age", age))
    }
}

/// Compile the birthdate pipeline
pub fn build_workflow(
    model: Arc<dyn Model>,
    age_tool: CalculateAgeTool,
    step_limit: usize,
) -> std::result::Result<Workflow, GraphError> {
    WorkflowBuilder::new("birthdate", schema())
        .add_node("step_one", StepOne::new(model.clone()))
        .add_node("step_two", StepTwo::new(model, age_tool)?)
        .add_edge(START, "step_one")
        .add_edge("step_one", "step_two")
        .add_edge("step_two", END)
        .step_limit(step_limit)
        .compile()
}

/// Run the pipeline for `name` and return the age text
pub async fn age_of(workflow: &Workflow, name: &str) -> Result<String> {
    let state = workflow.invoke(workflow.new_state().with("name", name)).await?;
    Ok(state.require_str("age")?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct Silent;

    #[async_trait]
    impl Model for Silent {
        async fn generate_content(
            &self,
            _history: &[Content],
            _config: Option<&crate::adk::model::GenerationConfig>,
            _tools: &[ToolSpec],
        ) -> std::result::Result<Content, crate::adk::error::ModelError> {
            Ok(Content::assistant(""))
        }

        async fn generate_structured(
            &self,
            _history: &[Content],
            _schema: &crate::adk::model::OutputSchema,
        ) -> std::result::Result<serde_json::Value, crate::adk::error::ModelError> {
            Ok(serde_json::Value::Null)
        }
    }

    #[test]
    fn test_step_two_prompt_carries_today_and_birthdate() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let step = StepTwo::new(Arc::new(Silent), CalculateAgeTool::with_today(today)).unwrap();
        let prompt = step.prompt("1978-10-29");
        assert!(prompt.contains("current date is 2026-10-18"));
        assert!(prompt.contains("Birthdate: 1978-10-29"));
        assert!(prompt.ends_with("Age: "));
    }

    #[tokio::test]
    async fn test_missing_name_fails_step_one() {
        let wf = build_workflow(Arc::new(Silent), CalculateAgeTool::new(), 10).unwrap();
        let err = wf.invoke(wf.new_state()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Node 'step_one' failed: State field 'name' is missing or not a string"
        );
    }
}
