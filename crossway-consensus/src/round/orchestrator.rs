use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::{AbortHandle, JoinSet};
use tokio::time::{sleep, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crossway_common::{utils::time::now, Direction, Vehicle};

use super::config::RoundConfig;
use super::report::RoundReport;
use super::session::RoundSession;
use crate::message::{PeerRequest, ResponseStatus};
use crate::network::PeerNetwork;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassOutcome {
    Leader(i32),
    NoLeader,
    DeadlineExpired,
}

/// Drives one round of the intersection protocol over a set of vehicles.
pub struct RoundOrchestrator {
    network: Arc<dyn PeerNetwork>,
    config: RoundConfig,
    shutdown: CancellationToken,
}

impl RoundOrchestrator {
    pub fn new(network: Arc<dyn PeerNetwork>, config: RoundConfig) -> Self {
        Self {
            network,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Rounds stop at the next pass boundary once `token` is cancelled.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Runs passes until every vehicle has crossed.
    ///
    /// `byzantine` may name vehicles outside `vehicles`; those are ignored.
    pub async fn run_round(&self, vehicles: &[i32], byzantine: &HashSet<i32>) -> RoundReport {
        let round_id = Uuid::new_v4();
        let started = Instant::now();
        let session = Arc::new(RoundSession::new(
            vehicles,
            byzantine,
            self.shutdown.child_token(),
        ));

        let mut held_back = Duration::ZERO;
        let mut fallback_triggered = false;
        let mut fallback_cleared = Vec::new();
        let mut passes = 0;
        let mut byzantine_released = 0;

        let byzantine_count = session.state.lock().await.byzantine.len();
        info!(
            target: "consensus",
            "EVENT:ROUND_START id={} vehicles={} byzantine={}",
            round_id,
            vehicles.len(),
            byzantine_count
        );

        loop {
            if session.is_shut_down() {
                warn!("round {} interrupted by shutdown", round_id);
                break;
            }

            let total = session.state.lock().await.active.len();
            if total == 0 {
                break;
            }

            let deadline = started + held_back + self.config.vision_time;
            if total > 1 && Instant::now() >= deadline {
                fallback_triggered = true;
                fallback_cleared.extend(self.vision_fallback(&session).await);
                byzantine_released += self.release_byzantine(&session, &mut held_back).await;
                continue;
            }

            passes += 1;
            match total {
                1 => self.pass_single(&session).await,
                2 => self.pass_pair(&session, &mut held_back).await,
                _ => {
                    match self.negotiate(&session, total, deadline).await {
                        PassOutcome::Leader(leader) => {
                            debug!("round {} pass {}: vehicle {} led", round_id, passes, leader)
                        }
                        PassOutcome::NoLeader => {
                            debug!("round {} pass {}: no leader", round_id, passes)
                        }
                        PassOutcome::DeadlineExpired => {
                            fallback_triggered = true;
                            fallback_cleared.extend(self.vision_fallback(&session).await);
                        }
                    }
                    byzantine_released += self.release_byzantine(&session, &mut held_back).await;
                }
            }
        }

        self.network.stop_all().await;

        let state = session.state.lock().await;
        let report = RoundReport {
            round_id,
            vehicles: vehicles.len(),
            passed: state.passed,
            leaders: state.leaders.clone(),
            fallback_triggered,
            fallback_cleared,
            passes,
            byzantine_released,
            elapsed: started.elapsed(),
        };
        info!(
            target: "consensus",
            "EVENT:ROUND id={} vehicles={} passed={} leaders={:?} fallback={} elapsed_ms={}",
            report.round_id,
            report.vehicles,
            report.passed,
            report.leaders,
            report.fallback_triggered,
            report.elapsed.as_millis()
        );
        report
    }

    async fn pass_single(&self, session: &RoundSession) {
        let mut state = session.state.lock().await;
        if let Some(&vehicle) = state.active.first() {
            state.pass_vehicle(vehicle);
            info!(target: "consensus", "EVENT:PASS vehicle={} alone", vehicle);
        }
    }

    /// Two vehicles see each other unless one is Byzantine; then a human
    /// arbitrates and the wait does not count against the vision budget.
    async fn pass_pair(&self, session: &RoundSession, held_back: &mut Duration) {
        let (pair, visible) = {
            let state = session.state.lock().await;
            let pair: Vec<i32> = state.active.iter().copied().take(2).collect();
            let visible = pair.iter().all(|v| !state.is_byzantine(*v));
            (pair, visible)
        };

        if visible {
            sleep(self.config.vision_time).await;
        } else {
            *held_back += self.config.manual_arbitration_delay;
            sleep(self.config.manual_arbitration_delay).await;
        }

        let mut state = session.state.lock().await;
        for vehicle in pair {
            state.pass_vehicle(vehicle);
        }
        info!(target: "consensus", "EVENT:PASS pair visible={}", visible);
    }

    /// Full vote mesh among the non-Byzantine vehicles, with leader election
    /// as soon as a candidate reaches the threshold.
    async fn negotiate(&self, session: &Arc<RoundSession>, total: usize, deadline: Instant) -> PassOutcome {
        let (active, participants) = {
            let mut state = session.state.lock().await;
            state.begin_pass();
            (state.active.clone(), state.participants())
        };

        let directions = self.draw_directions(&active);
        let startups = join_all(active.iter().map(|&number| {
            let direction = directions.get(&number).copied().unwrap_or(Direction::Rs);
            self.network.start_peer(Vehicle::new(number, direction))
        }))
        .await;
        for (number, result) in active.iter().zip(startups) {
            if let Err(e) = result {
                warn!("peer {} failed to start: {}", number, e);
            }
        }

        let total = u32::try_from(total).unwrap_or(u32::MAX);
        let token = session.pass_token();
        let ctx = PassContext {
            session: session.clone(),
            network: self.network.clone(),
            token: token.clone(),
            directions: Arc::new(directions),
            participants: Arc::new(participants.clone()),
            threshold: self.config.quorum_policy.threshold(total),
            total,
        };

        let mut mesh = JoinSet::new();
        {
            let mut rng = rand::thread_rng();
            for &from in &participants {
                for &to in &participants {
                    if from != to {
                        mesh.spawn(ctx.clone().vote(from, to, self.config.jitter(&mut rng)));
                    }
                }
            }
        }

        let drained = timeout_at(deadline, async {
            while let Some(joined) = mesh.join_next().await {
                if let Err(e) = joined {
                    if e.is_panic() {
                        warn!("vote task panicked: {}", e);
                    }
                }
            }
        })
        .await;

        token.cancel();
        mesh.abort_all();
        session.state.lock().await.abort_syncs();
        self.network.stop_all().await;

        if drained.is_err() {
            return PassOutcome::DeadlineExpired;
        }
        match session.state.lock().await.pass_leader() {
            Some(leader) => PassOutcome::Leader(leader),
            None => PassOutcome::NoLeader,
        }
    }

    fn draw_directions(&self, active: &[i32]) -> HashMap<i32, Direction> {
        let mut rng = rand::thread_rng();
        active
            .iter()
            .map(|&number| (number, self.config.directions.assign(number, &mut rng)))
            .collect()
    }

    async fn vision_fallback(&self, session: &RoundSession) -> Vec<i32> {
        sleep(self.config.vision_time).await;
        let cleared = session.state.lock().await.clear_visible();
        info!(target: "consensus", "EVENT:FALLBACK cleared={:?}", cleared);
        cleared
    }

    async fn release_byzantine(&self, session: &RoundSession, held_back: &mut Duration) -> usize {
        let released = session
            .state
            .lock()
            .await
            .release_byzantine(&mut rand::thread_rng());
        if released.is_empty() {
            return 0;
        }

        info!(target: "consensus", "EVENT:RELEASE byzantine={:?}", released);
        *held_back += self.config.byzantine_release_delay;
        sleep(self.config.byzantine_release_delay).await;
        released.len()
    }
}

/// Everything a vote or election task needs, cheap to clone per task.
#[derive(Clone)]
struct PassContext {
    session: Arc<RoundSession>,
    network: Arc<dyn PeerNetwork>,
    token: CancellationToken,
    directions: Arc<HashMap<i32, Direction>>,
    participants: Arc<Vec<i32>>,
    threshold: u32,
    total: u32,
}

impl PassContext {
    async fn vote(self, from: i32, to: i32, jitter: Duration) {
        let token = self.token.clone();
        tokio::select! {
            biased;
            _ = token.cancelled() => {}
            _ = self.request_vote(from, to, jitter) => {}
        }
    }

    fn request(&self, vehicle: Vehicle) -> PeerRequest {
        PeerRequest {
            port: self.network.endpoint(vehicle.address),
            vehicle,
            total_vehicles: self.total,
        }
    }

    async fn request_vote(&self, from: i32, to: i32, jitter: Duration) {
        sleep(jitter).await;

        let Some(&direction) = self.directions.get(&from) else {
            return;
        };
        let res = match self
            .network
            .register_vote(to, self.request(Vehicle::new(from, direction)))
            .await
        {
            Ok(res) => res,
            Err(e) => {
                debug!("vote {} -> {} dropped: {}", from, to, e);
                return;
            }
        };
        if !res.is(ResponseStatus::Acknowledged) {
            return;
        }
        info!(target: "consensus", "EVENT:VOTE from={} to={} compatible={:?}", from, to, res.compatible);

        let (Some(true), Some(responder), Some(response_direction)) =
            (res.compatible, res.vehicle.as_ref(), res.response_direction)
        else {
            return;
        };

        let snapshot = {
            let mut state = self.session.state.lock().await;
            if self.token.is_cancelled() {
                return;
            }
            let aggregate = state.aggregate_mut(from, direction);
            aggregate.merge_co_vehicle(responder.peer(), response_direction);
            aggregate.votes_received += 1;
            aggregate.election_time = now();
            let snapshot = aggregate.clone();
            state.track_sync(self.spawn_sync(snapshot.clone()));
            snapshot
        };

        if snapshot.is_candidate() && snapshot.votes_received >= self.threshold {
            self.broadcast_election(snapshot).await;
        }
    }

    /// Best-effort push of the tally to the candidate's own peer.
    fn spawn_sync(&self, snapshot: Vehicle) -> AbortHandle {
        let network = self.network.clone();
        let target = snapshot.address;
        let req = self.request(snapshot);
        tokio::spawn(async move {
            match network.sync_votes(target, req).await {
                Ok(res) if res.is(ResponseStatus::Success) => {}
                Ok(res) => debug!("sync to {} refused: {}", target, res.message),
                Err(e) => debug!("sync to {} failed: {}", target, e),
            }
        })
        .abort_handle()
    }

    async fn broadcast_election(&self, candidate: Vehicle) {
        let mut ballots = JoinSet::new();
        for &peer in self.participants.iter().filter(|&&p| p != candidate.number) {
            let network = self.network.clone();
            let req = self.request(candidate.clone());
            ballots.spawn(async move { (peer, network.elect_leader(peer, req).await) });
        }

        while let Some(joined) = ballots.join_next().await {
            let Ok((peer, result)) = joined else {
                continue;
            };
            let res = match result {
                Ok(res) => res,
                Err(e) => {
                    debug!("election {} -> {} dropped: {}", candidate.number, peer, e);
                    continue;
                }
            };

            let mut state = self.session.state.lock().await;
            if self.token.is_cancelled() {
                return;
            }
            let aggregate = state.aggregate_mut(candidate.number, candidate.direction);

            match res.status {
                ResponseStatus::Acknowledged => {
                    aggregate.election_votes += 1;
                    if aggregate.is_candidate() && aggregate.election_votes >= self.threshold {
                        let leader = aggregate.clone();
                        let crossed = state.declare_leader(&leader);
                        info!(
                            target: "consensus",
                            "EVENT:LEADER id={} votes={} election_votes={} crossed={:?}",
                            leader.number,
                            leader.votes_received,
                            leader.election_votes,
                            crossed
                        );
                        self.token.cancel();
                        return;
                    }
                }
                ResponseStatus::Ignored => {
                    if let Some(demoted) = res.vehicle.filter(|v| v.number == candidate.number) {
                        aggregate.concede(demoted.votes_received, demoted.election_time);
                        debug!("candidate {} demoted by {}", candidate.number, peer);
                    }
                }
                _ => {}
            }
        }
    }
}
