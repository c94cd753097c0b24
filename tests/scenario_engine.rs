use std::sync::{Arc, Mutex};

use rehearsal::{
    AgentAdapter, AgentRole, ChatMessage, EventBus, MemoryReporter, ProceedOptions, RunStatus,
    ScenarioConfig, ScenarioError, ScenarioEvent, ScenarioExecution, ScenarioResult, ScenarioRunner,
    ScriptStep, ScriptedAgent, StepOutcome,
};

fn replying(name: &str, role: AgentRole, reply: &str) -> Arc<ScriptedAgent> {
    Arc::new(ScriptedAgent::new(name, [role]).repeating(reply))
}

fn scenario() -> ScenarioConfig {
    ScenarioConfig::new("vegetarian recipe", "User is looking for a vegetarian dinner idea")
}

#[tokio::test]
async fn judge_concludes_on_the_first_full_turn() {
    let tester = ScriptedAgent::new("tester", [AgentRole::User, AgentRole::Judge])
        .repeating("hi")
        .with_verdict_after(1, ScenarioResult::success("agent answered"));
    let config = scenario()
        .with_shared_agent(replying("bot", AgentRole::Agent, "ok"))
        .with_agent(tester);

    let mut execution = ScenarioExecution::new(config);
    let result = execution.execute().await.unwrap();

    assert!(result.success);
    assert_eq!(execution.turn(), Some(1));
    assert_eq!(
        result.messages,
        vec![ChatMessage::user("hi"), ChatMessage::assistant("ok")]
    );
}

#[tokio::test]
async fn unused_roles_are_never_requested() {
    let bot = replying("bot", AgentRole::Agent, "ok");
    let config = scenario()
        .with_shared_agent(bot.clone())
        .with_script(vec![ScriptStep::proceed()]);

    let result = rehearsal::run(config).await.unwrap();

    assert!(!result.success);
    assert_eq!(bot.calls(), 10);
    assert!(result.messages.iter().all(|message| message.text() == Some("ok")));
}

#[tokio::test]
async fn requesting_an_absent_role_is_a_configuration_error() {
    let bot = replying("bot", AgentRole::Agent, "ok");
    let config = scenario()
        .with_shared_agent(bot.clone())
        .with_script(vec![ScriptStep::user(), ScriptStep::proceed()]);

    let error = rehearsal::run(config).await.unwrap_err();

    assert!(matches!(
        error,
        ScenarioError::NoParticipantForRole { role: AgentRole::User, content: None }
    ));
    assert_eq!(bot.calls(), 0);
}

#[tokio::test]
async fn turn_limit_ends_with_a_failure_verdict() {
    let user = replying("user", AgentRole::User, "and then?");
    let bot = replying("bot", AgentRole::Agent, "more curry");
    let judge = ScriptedAgent::new("judge", [AgentRole::Judge]).with_criteria(["Recipe is vegetarian"]);
    let config = scenario()
        .with_shared_agent(user.clone())
        .with_shared_agent(bot.clone())
        .with_max_turns(2);

    let result = rehearsal::run(config.clone()).await.unwrap();

    assert!(!result.success);
    assert!(result.reasoning.contains("maximum turns (2)"));
    assert_eq!((user.calls(), bot.calls()), (2, 2));
    assert_eq!(result.messages.len(), 4);
    assert!(result.failed_criteria.is_empty());

    // a silent judge's criteria are reported as unmet
    let judge_config = config.with_agent(judge.repeating(Vec::<ChatMessage>::new()));
    let result = rehearsal::run(judge_config).await.unwrap();
    assert_eq!(result.failed_criteria, vec!["Recipe is vegetarian".to_string()]);
}

#[tokio::test]
async fn participant_failure_becomes_a_verdict() {
    let judge = ScriptedAgent::new("judge", [AgentRole::Judge]).with_criteria(["Answers the question"]);
    let config = scenario()
        .with_shared_agent(replying("user", AgentRole::User, "dinner?"))
        .with_agent(ScriptedAgent::new("bot", [AgentRole::Agent]).failing("network timeout"))
        .with_agent(judge);

    let result = rehearsal::run(config).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.reasoning, "Agent error: network timeout");
    assert_eq!(result.messages, vec![ChatMessage::user("dinner?")]);
    assert_eq!(result.failed_criteria, vec!["Answers the question".to_string()]);
}

#[tokio::test]
async fn scripted_conversation_ends_with_explicit_success() {
    let judge = ScriptedAgent::new("judge", [AgentRole::Judge]).with_criteria(["Never met"]);
    let config = scenario()
        .with_shared_agent(replying("user", AgentRole::User, "unused"))
        .with_shared_agent(replying("bot", AgentRole::Agent, "Try a chickpea stew"))
        .with_agent(judge)
        .with_script(vec![
            ScriptStep::user_says("hi"),
            ScriptStep::agent(),
            ScriptStep::succeed(),
        ]);

    let result = rehearsal::run(config).await.unwrap();

    assert!(result.success);
    assert_eq!(
        result.messages,
        vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("Try a chickpea stew")
        ]
    );
}

#[tokio::test]
async fn script_without_conclusion_fails_with_guidance() {
    let config = scenario()
        .with_shared_agent(replying("user", AgentRole::User, "hello"))
        .with_shared_agent(replying("bot", AgentRole::Agent, "hi"))
        .with_script(vec![ScriptStep::user(), ScriptStep::agent()]);

    let result = rehearsal::run(config).await.unwrap();

    assert!(!result.success);
    assert!(result.reasoning.starts_with("Reached end of script without conclusion"));
    assert!(result.reasoning.contains("ScriptStep::proceed()"));
    assert_eq!(result.messages.len(), 2);
}

#[tokio::test]
async fn every_step_grows_history_or_finishes() {
    let participants = 2;
    let max_turns = 3;
    let config = scenario()
        .with_shared_agent(replying("user", AgentRole::User, "hi"))
        .with_shared_agent(replying("bot", AgentRole::Agent, "hello"))
        .with_max_turns(max_turns);
    let mut execution = ScenarioExecution::new(config);

    let mut finished = false;
    for _ in 0..=participants * max_turns {
        let before = execution.history().len();
        match execution.step().await {
            StepOutcome::Finished(_) => {
                finished = true;
                break;
            }
            StepOutcome::Messages(messages) => {
                assert!(!messages.is_empty());
                assert!(execution.history().len() > before);
            }
        }
    }
    assert!(finished);
}

#[tokio::test]
async fn turns_never_go_backwards() {
    let turns = Arc::new(Mutex::new(Vec::new()));
    let options = {
        let turns = Arc::clone(&turns);
        ProceedOptions::default().on_step(move |execution| {
            turns.lock().unwrap().push(execution.turn().unwrap_or_default());
        })
    };
    let config = scenario()
        .with_shared_agent(replying("user", AgentRole::User, "hi"))
        .with_shared_agent(replying("bot", AgentRole::Agent, "hello"))
        .with_max_turns(4)
        .with_script(vec![
            ScriptStep::user_says("start"),
            ScriptStep::proceed_for(2),
            ScriptStep::agent_says("interjection"),
            ScriptStep::proceed_with(options),
        ]);

    let result = rehearsal::run(config).await.unwrap();
    assert!(!result.success);

    let turns = turns.lock().unwrap();
    assert!(!turns.is_empty());
    assert!(turns.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn injected_messages_never_call_participants() {
    let user = replying("user", AgentRole::User, "hi");
    let bot = replying("bot", AgentRole::Agent, "hello");
    let agents: [Arc<dyn AgentAdapter>; 2] = [user.clone(), bot.clone()];
    let mut execution = ScenarioExecution::new(scenario().with_agents(agents.to_vec()));

    for (index, message) in [
        ChatMessage::user("one"),
        ChatMessage::assistant("two"),
        ChatMessage::system("three"),
        ChatMessage::user("four"),
    ]
    .into_iter()
    .enumerate()
    {
        execution.message(message).await.unwrap();
        assert_eq!(execution.history().len(), index + 1);
    }

    assert_eq!(user.calls() + bot.calls(), 0);
}

#[tokio::test]
async fn runner_reports_error_status_for_participant_failures() {
    let reporter = MemoryReporter::new();
    let runner = ScenarioRunner::new()
        .with_batch_run_id("scenario_batch_run_engine_tests")
        .with_events(EventBus::new(Arc::new(reporter.clone())));
    let config = scenario()
        .with_shared_agent(replying("user", AgentRole::User, "hi"))
        .with_agent(ScriptedAgent::new("bot", [AgentRole::Agent]).failing("boom"));

    let result = runner.run(config).await.unwrap();
    assert!(!result.success);

    let events = reporter.events();
    assert!(matches!(events.first(), Some(ScenarioEvent::RunStarted { .. })));
    assert!(matches!(
        events.last(),
        Some(ScenarioEvent::RunFinished { status: RunStatus::Error, .. })
    ));
    let snapshots: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            ScenarioEvent::MessageSnapshot { messages, .. } => Some(messages.len()),
            _ => None,
        })
        .collect();
    assert_eq!(snapshots, vec![1]);
}
