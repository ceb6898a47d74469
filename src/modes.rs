use std::path::Path;

use crate::agent::Agent;
use crate::config::{AgentConfig, TrainConfig, CHECKPOINT_FILE, FROZEN_FILE};
use crate::env::Environment;
use crate::error::Result;
use crate::export::frozen::FrozenModel;
use crate::network::QNetwork;
use crate::replay_buffer::Transition;

/// Summary of a finished training run.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub games: i32,
    pub record: i32,
    pub total_steps: usize,
}

/// Train an agent against the environment.
///
/// Each step: act, play, remember, one short-memory gradient step on the new
/// transition, one long-memory batch step from the replay buffer. The target
/// network hard-syncs every `sync_every` steps, and every new best score
/// saves a checkpoint under the model directory.
pub fn train<E: Environment>(
    env: &mut E,
    agent_config: &AgentConfig,
    train_config: &TrainConfig,
) -> Result<TrainReport> {
    let mut agent = Agent::new(env.n_state(), env.n_action(), agent_config)?;
    let checkpoint_path = train_config.model_dir.join(CHECKPOINT_FILE);
    let mut record = 0;
    let mut total_steps = 0usize;
    let mut state_new = env.get_state();

    loop {
        let state_old = state_new;
        let action = agent.get_action(state_old.view(), agent.n_game, true)?;
        let (reward, done, score) = env.play_step(action);
        state_new = env.get_state();

        let transition = Transition {
            state: state_old,
            action,
            reward,
            next_state: state_new.clone(),
            done,
        };
        agent.train_short_memory(&transition)?;
        agent.remember(transition);
        agent.train_long_memory(train_config.batch_size)?;

        total_steps += 1;
        if total_steps % train_config.sync_every == 0 {
            agent.trainer.copy_model();
        }

        if done {
            env.reset();
            agent.n_game += 1;
            if score > record {
                record = score;
                agent.trainer.model.save(&checkpoint_path)?;
                println!("Saved model");
            }
            println!(
                "Game {} Score {} Record: {}",
                agent.n_game, score, record
            );

            if let Some(max_games) = train_config.max_games {
                if agent.n_game as usize >= max_games {
                    break;
                }
            }
        }
    }

    Ok(TrainReport {
        games: agent.n_game,
        record,
        total_steps,
    })
}

/// Play greedily with a previously frozen model. Returns the score of each
/// finished game.
pub fn play<E: Environment>(env: &mut E, model_dir: &Path, max_games: usize) -> Result<Vec<i32>> {
    let model = FrozenModel::load(&model_dir.join(FROZEN_FILE))?;
    let mut scores = Vec::with_capacity(max_games);
    let mut record = 0;

    while scores.len() < max_games {
        let state = env.get_state();
        let q_values = model.forward(state.view())?;
        let action = crate::activations::argmax(q_values.view());
        let (_reward, done, score) = env.play_step(action);

        if done {
            env.reset();
            if score > record {
                record = score;
            }
            println!("Game {} Score {} Record: {}", scores.len() + 1, score, record);
            scores.push(score);
        }
    }

    Ok(scores)
}

/// Reload the native checkpoint from the model directory and write the
/// traced, inference-only graph next to it.
pub fn export_frozen(
    model_dir: &Path,
    input_dim: usize,
    hidden_dim: usize,
    output_dim: usize,
) -> Result<()> {
    let network = QNetwork::load(
        &model_dir.join(CHECKPOINT_FILE),
        input_dim,
        hidden_dim,
        output_dim,
    )?;
    network.save_frozen(&model_dir.join(FROZEN_FILE))
}
