// crates/rotation-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Rotation Gate Test Fixtures
// Description: Fakes for external collaborators and rule set builders.
// Purpose: Wire the orchestrator against deterministic, inspectable fakes.
// ============================================================================

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test helpers are selectively used across suites."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use rotation_gate_core::AutomationStance;
use rotation_gate_core::Clock;
use rotation_gate_core::Credential;
use rotation_gate_core::CredentialId;
use rotation_gate_core::CredentialVault;
use rotation_gate_core::DecisionOutcome;
use rotation_gate_core::HimConfig;
use rotation_gate_core::HimPrompt;
use rotation_gate_core::HimSessionManager;
use rotation_gate_core::InMemoryRuleCache;
use rotation_gate_core::OrchestratorConfig;
use rotation_gate_core::OrchestratorDeps;
use rotation_gate_core::PolicyAnalyzer;
use rotation_gate_core::PolicyDocument;
use rotation_gate_core::PolicySource;
use rotation_gate_core::PromptChannel;
use rotation_gate_core::PromptError;
use rotation_gate_core::RefreshError;
use rotation_gate_core::RetryPolicy;
use rotation_gate_core::RotationOrchestrator;
use rotation_gate_core::Rule;
use rotation_gate_core::RuleCacheConfig;
use rotation_gate_core::RuleCategory;
use rotation_gate_core::RuleId;
use rotation_gate_core::RuleImplications;
use rotation_gate_core::RuleSet;
use rotation_gate_core::RuleValidator;
use rotation_gate_core::SecretValue;
use rotation_gate_core::Severity;
use rotation_gate_core::SignedHashChainLedger;
use rotation_gate_core::SubjectHasher;
use rotation_gate_core::SystemClock;
use rotation_gate_core::TargetId;
use rotation_gate_core::Timestamp;
use rotation_gate_core::ValidatorConfig;
use rotation_gate_core::VaultError;
use tokio::sync::mpsc;

// ============================================================================
// SECTION: Rule Builders
// ============================================================================

/// Fixed reference time for deterministic tests.
pub const T0: i64 = 1_700_000_000_000;

/// Builds a rule.
pub fn rule(
    id: &str,
    category: RuleCategory,
    severity: Severity,
    automation: AutomationStance,
    requires_confirmation: bool,
) -> Rule {
    Rule {
        rule_id: RuleId::new(id),
        category,
        severity,
        description: format!("rule {id}"),
        implications: RuleImplications {
            automation,
            requires_human_confirmation: requires_confirmation,
            rate_limit: None,
        },
        confidence: 0.9,
    }
}

/// Builds a rule set created at `created_at` with a 30 day expiry.
pub fn rule_set(target: &str, rules: Vec<Rule>, created_at: Timestamp) -> RuleSet {
    RuleSet {
        target_id: TargetId::new(target),
        source_version: "v1".to_string(),
        rules,
        recommendation: DecisionOutcome::HimRequired,
        confidence: 0.8,
        created_at,
        expires_at: created_at.saturating_add(Duration::from_secs(30 * 24 * 60 * 60)),
    }
}

/// Rule set that permits automation for every action.
pub fn permissive_rules(target: &str, created_at: Timestamp) -> RuleSet {
    rule_set(
        target,
        vec![rule(
            "permit-all",
            RuleCategory::GeneralAutomation,
            Severity::Low,
            AutomationStance::Permitted,
            false,
        )],
        created_at,
    )
}

/// Rule set with a critical prohibition.
pub fn blocking_rules(target: &str, created_at: Timestamp) -> RuleSet {
    rule_set(
        target,
        vec![rule(
            "no-bots",
            RuleCategory::GeneralAutomation,
            Severity::Critical,
            AutomationStance::Prohibited,
            false,
        )],
        created_at,
    )
}

/// Rule set requiring human confirmation for updates.
pub fn confirming_rules(target: &str, created_at: Timestamp) -> RuleSet {
    rule_set(
        target,
        vec![rule(
            "mfa-confirm",
            RuleCategory::MultiFactor,
            Severity::Medium,
            AutomationStance::Permitted,
            true,
        )],
        created_at,
    )
}

/// Fast retry policy for tests.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        multiplier: 2,
        max_backoff: Duration::from_millis(4),
    }
}

// ============================================================================
// SECTION: Vault Fake
// ============================================================================

/// In-memory credential vault.
#[derive(Default)]
pub struct FakeVault {
    /// Candidates returned by detection.
    pub candidates: Mutex<Vec<Credential>>,
    /// Locked flag.
    pub locked: Mutex<bool>,
    /// Transient failures returned by `is_locked` before succeeding.
    pub lock_check_failures: AtomicU32,
    /// Transient failures returned by detection before succeeding.
    pub detect_failures: AtomicU32,
    /// Error returned by every update call.
    pub update_error: Mutex<Option<VaultError>>,
    /// Successful updates, by credential id.
    pub updates: Mutex<Vec<(CredentialId, String)>>,
    /// Number of update calls.
    pub update_calls: AtomicUsize,
    /// Number of `is_locked` calls.
    pub lock_checks: AtomicUsize,
}

impl FakeVault {
    /// Creates a vault with one candidate per `(credential, target, api)` triple.
    pub fn with_candidates(candidates: &[(&str, &str, bool)]) -> Self {
        let vault = Self::default();
        *vault.candidates.lock().unwrap() = candidates
            .iter()
            .map(|(credential, target, api)| Credential {
                credential_id: CredentialId::new(*credential),
                target_id: TargetId::new(*target),
                supports_api: *api,
            })
            .collect();
        vault
    }

    /// Returns the number of update calls.
    pub fn update_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

/// Consumes one scheduled failure, returning true when one was pending.
fn take_failure(counter: &AtomicU32) -> bool {
    counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
}

#[async_trait]
impl CredentialVault for FakeVault {
    async fn detect_candidates(&self) -> Result<Vec<Credential>, VaultError> {
        if take_failure(&self.detect_failures) {
            return Err(VaultError::Unavailable("detect flake".to_string()));
        }
        Ok(self.candidates.lock().unwrap().clone())
    }

    async fn update_secret(
        &self,
        credential_id: &CredentialId,
        new_value: &SecretValue,
    ) -> Result<(), VaultError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.update_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.updates
            .lock()
            .unwrap()
            .push((credential_id.clone(), new_value.expose().to_string()));
        Ok(())
    }

    async fn is_locked(&self) -> Result<bool, VaultError> {
        self.lock_checks.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.lock_check_failures) {
            return Err(VaultError::Unavailable("lock check flake".to_string()));
        }
        Ok(*self.locked.lock().unwrap())
    }
}

// ============================================================================
// SECTION: Policy Fakes
// ============================================================================

/// Policy source returning a fixed document, optionally slowly or failing.
#[derive(Default)]
pub struct FakeSource {
    /// Delay applied to every fetch.
    pub delay: Mutex<Option<Duration>>,
    /// Failures returned before succeeding.
    pub failures: AtomicU32,
    /// Number of fetch calls.
    pub calls: AtomicUsize,
}

#[async_trait]
impl PolicySource for FakeSource {
    async fn fetch(&self, target_id: &TargetId) -> Result<PolicyDocument, RefreshError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if take_failure(&self.failures) {
            return Err(RefreshError::Source("fetch flake".to_string()));
        }
        Ok(PolicyDocument {
            target_id: target_id.clone(),
            version: "doc-v1".to_string(),
            content: "terms of service".to_string(),
        })
    }
}

/// Analyzer returning rule sets from per-target templates.
pub struct FakeAnalyzer {
    /// Templates keyed by target.
    pub templates: Mutex<Vec<RuleSet>>,
    /// Clock stamped onto returned rule sets.
    pub clock: Arc<dyn Clock>,
    /// Number of analyze calls.
    pub calls: AtomicUsize,
}

impl FakeAnalyzer {
    /// Creates an analyzer with no templates.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            templates: Mutex::new(Vec::new()),
            clock,
            calls: AtomicUsize::new(0),
        }
    }

    /// Registers a template rule set.
    pub fn add(&self, rule_set: RuleSet) {
        self.templates.lock().unwrap().push(rule_set);
    }
}

#[async_trait]
impl PolicyAnalyzer for FakeAnalyzer {
    async fn analyze(
        &self,
        target_id: &TargetId,
        document: &PolicyDocument,
    ) -> Result<RuleSet, RefreshError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let template = self
            .templates
            .lock()
            .unwrap()
            .iter()
            .find(|rule_set| &rule_set.target_id == target_id)
            .cloned()
            .ok_or_else(|| RefreshError::Analysis(format!("no template for {target_id}")))?;
        let now = self.clock.now();
        Ok(RuleSet {
            source_version: document.version.clone(),
            created_at: now,
            expires_at: now,
            ..template
        })
    }
}

// ============================================================================
// SECTION: Prompt Fake
// ============================================================================

/// Prompt channel forwarding prompts to the test over a channel.
pub struct ChannelPrompt {
    /// Prompt sender.
    sender: mpsc::UnboundedSender<HimPrompt>,
    /// Whether delivery fails.
    pub fail: Mutex<bool>,
}

impl ChannelPrompt {
    /// Creates a channel prompt and its receiver.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HimPrompt>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                fail: Mutex::new(false),
            },
            receiver,
        )
    }
}

#[async_trait]
impl PromptChannel for ChannelPrompt {
    async fn deliver(&self, prompt: &HimPrompt) -> Result<(), PromptError> {
        if *self.fail.lock().unwrap() {
            return Err(PromptError::Delivery("prompt surface offline".to_string()));
        }
        self.sender
            .send(prompt.clone())
            .map_err(|_| PromptError::Delivery("receiver dropped".to_string()))
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Harness options.
pub struct HarnessOptions {
    /// Validator configuration.
    pub validator: ValidatorConfig,
    /// HIM configuration.
    pub him: HimConfig,
    /// Orchestrator configuration.
    pub orchestrator: OrchestratorConfig,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            validator: ValidatorConfig::default(),
            him: HimConfig::default(),
            orchestrator: OrchestratorConfig {
                refresh_enabled: true,
                refresh_timeout: Duration::from_secs(2),
                retry: fast_retry(),
            },
        }
    }
}

/// Fully wired orchestrator with inspectable fakes.
pub struct Harness {
    /// Wall clock shared by every component.
    pub clock: Arc<dyn Clock>,
    /// Audit ledger.
    pub audit: Arc<SignedHashChainLedger>,
    /// Evidence ledger.
    pub evidence: Arc<SignedHashChainLedger>,
    /// Rule cache.
    pub cache: Arc<InMemoryRuleCache>,
    /// HIM manager.
    pub him: Arc<HimSessionManager>,
    /// Vault fake.
    pub vault: Arc<FakeVault>,
    /// Policy source fake.
    pub source: Arc<FakeSource>,
    /// Analyzer fake.
    pub analyzer: Arc<FakeAnalyzer>,
    /// Prompt channel fake.
    pub prompts: Arc<ChannelPrompt>,
    /// Delivered prompts.
    pub prompt_rx: mpsc::UnboundedReceiver<HimPrompt>,
    /// Orchestrator under test.
    pub orchestrator: Arc<RotationOrchestrator>,
}

impl Harness {
    /// Builds a harness around `vault`.
    pub fn new(vault: FakeVault, options: HarnessOptions) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let audit = Arc::new(SignedHashChainLedger::new("audit", Arc::clone(&clock)));
        let evidence = Arc::new(SignedHashChainLedger::new("evidence", Arc::clone(&clock)));
        let cache =
            Arc::new(InMemoryRuleCache::new(RuleCacheConfig::default(), Arc::clone(&clock)));
        let him = Arc::new(HimSessionManager::new(options.him, Arc::clone(&clock)));
        let vault = Arc::new(vault);
        let source = Arc::new(FakeSource::default());
        let analyzer = Arc::new(FakeAnalyzer::new(Arc::clone(&clock)));
        let (prompts, prompt_rx) = ChannelPrompt::new();
        let prompts = Arc::new(prompts);
        let deps = OrchestratorDeps {
            audit_ledger: audit.clone(),
            evidence_ledger: evidence.clone(),
            rule_cache: cache.clone(),
            validator: Arc::new(RuleValidator::new(options.validator)),
            him: him.clone(),
            vault: vault.clone(),
            policy_source: source.clone(),
            policy_analyzer: analyzer.clone(),
            prompt_channel: prompts.clone(),
            subject_hasher: SubjectHasher::new("test-salt"),
            clock: Arc::clone(&clock),
        };
        let orchestrator = Arc::new(RotationOrchestrator::new(options.orchestrator, deps));
        Self {
            clock,
            audit,
            evidence,
            cache,
            him,
            vault,
            source,
            analyzer,
            prompts,
            prompt_rx,
            orchestrator,
        }
    }

    /// Returns the current time.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }
}
