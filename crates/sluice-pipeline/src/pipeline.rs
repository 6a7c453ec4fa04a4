// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The pipeline orchestrator.
//!
//! [`Pipeline`] owns every maker and live runner, the router, and both
//! envelope pools. Plugins reach it through [`PluginHelper`]; runners are
//! started producer-last and shut down producer-first.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use async_trait::async_trait;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use sluice_config::GlobalConfig;
use sluice_core::{
    Decoder, DecoderRunner, Encoder, Envelope, EnvelopeSource, FilterRunner, OutputRunner,
    PluginCategory, PluginHelper, SluiceError,
};
use sluice_plugin::PluginRegistry;

use crate::context::RunnerContext;
use crate::maker::PluginMaker;
use crate::router::MessageRouter;
use crate::runner::{DecRunner, FoRunner, InRunner, RunnerHandle};

type MakerMap = HashMap<PluginCategory, BTreeMap<String, Arc<PluginMaker>>>;

/// Makers, live runners, pools, and the router for one configuration.
pub struct Pipeline {
    registry: Arc<PluginRegistry>,
    globals: GlobalConfig,
    ctx: RunnerContext,
    makers: RwLock<MakerMap>,
    decoder_order: Mutex<Vec<String>>,
    inputs: RwLock<BTreeMap<String, Arc<InRunner>>>,
    filters: RwLock<BTreeMap<String, Arc<FoRunner>>>,
    outputs: RwLock<BTreeMap<String, Arc<FoRunner>>>,
    decoders: RwLock<Vec<Arc<DecRunner>>>,
    encoders: RwLock<HashMap<String, Arc<dyn Encoder>>>,
    log: Mutex<Vec<String>>,
    started: AtomicBool,
    stopping: AtomicBool,
    input_tasks: TaskTracker,
    decoder_tasks: TaskTracker,
    filter_tasks: TaskTracker,
    output_tasks: TaskTracker,
    this: Weak<Pipeline>,
}

impl Pipeline {
    /// An empty pipeline; load a configuration before starting it.
    pub fn new(registry: Arc<PluginRegistry>, globals: GlobalConfig) -> Arc<Self> {
        let ctx = RunnerContext::new(&globals);
        Arc::new_cyclic(|this| Self {
            registry,
            globals,
            ctx,
            makers: RwLock::new(HashMap::new()),
            decoder_order: Mutex::new(Vec::new()),
            inputs: RwLock::new(BTreeMap::new()),
            filters: RwLock::new(BTreeMap::new()),
            outputs: RwLock::new(BTreeMap::new()),
            decoders: RwLock::new(Vec::new()),
            encoders: RwLock::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
            input_tasks: TaskTracker::new(),
            decoder_tasks: TaskTracker::new(),
            filter_tasks: TaskTracker::new(),
            output_tasks: TaskTracker::new(),
            this: this.clone(),
        })
    }

    /// Daemon settings this pipeline was built with.
    pub fn globals(&self) -> &GlobalConfig {
        &self.globals
    }

    /// Plugin types available to sections.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Router, pools, and shutdown token shared with runners.
    pub fn context(&self) -> &RunnerContext {
        &self.ctx
    }

    /// The router filters and outputs are attached to.
    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.ctx.router
    }

    pub(crate) fn helper_ref(&self) -> Weak<dyn PluginHelper> {
        self.this.clone()
    }

    /// An envelope from the pool for `source`, stamped with a fresh
    /// identity. `None` once `msg_loop_count + 1` exceeds `max_msg_loops`.
    pub async fn acquire(&self, source: EnvelopeSource, msg_loop_count: u32) -> Option<Envelope> {
        self.ctx.acquire(source, msg_loop_count).await
    }

    /// An envelope from the inject pool for re-injected messages.
    pub async fn acquire_envelope(&self, msg_loop_count: u32) -> Option<Envelope> {
        self.acquire(EnvelopeSource::Reinjected, msg_loop_count).await
    }

    /// Record a load or lifecycle failure in the message log.
    pub(crate) fn record(&self, message: String) {
        error!("{message}");
        lock(&self.log).push(message);
    }

    /// Whether `message` is already in the message log.
    pub(crate) fn has_logged(&self, message: &str) -> bool {
        lock(&self.log).iter().any(|logged| logged == message)
    }

    /// Messages recorded while loading and running.
    pub fn log_messages(&self) -> Vec<String> {
        lock(&self.log).clone()
    }

    /// Keep a built maker; decoders also remember load order.
    pub(crate) fn register_maker(&self, maker: Arc<PluginMaker>) {
        if maker.category() == PluginCategory::Decoder {
            lock(&self.decoder_order).push(maker.name().to_string());
        }
        write(&self.makers)
            .entry(maker.category())
            .or_default()
            .insert(maker.name().to_string(), maker);
    }

    /// Keep a runner built during load until `start`.
    pub(crate) fn register_runner(&self, runner: RunnerHandle) {
        match runner {
            RunnerHandle::Input(runner) => {
                write(&self.inputs).insert(runner.name().to_string(), runner);
            }
            RunnerHandle::Filter(runner) => {
                write(&self.filters).insert(runner.name().to_string(), runner);
            }
            RunnerHandle::Output(runner) => {
                write(&self.outputs).insert(runner.name().to_string(), runner);
            }
            // Decoder runners exist only per input; the one built while
            // loading just proves the section works.
            RunnerHandle::Decoder(_) => {}
        }
    }

    /// The maker for section `name` of `category`.
    pub fn maker(&self, category: PluginCategory, name: &str) -> Option<Arc<PluginMaker>> {
        read(&self.makers)
            .get(&category)
            .and_then(|makers| makers.get(name))
            .cloned()
    }

    /// Registered makers of `category`, sorted by name.
    pub fn makers(&self, category: PluginCategory) -> Vec<Arc<PluginMaker>> {
        read(&self.makers)
            .get(&category)
            .map(|makers| makers.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Decoder maker names in the order they were loaded.
    pub fn decoder_order(&self) -> Vec<String> {
        lock(&self.decoder_order).clone()
    }

    /// A registered input runner.
    pub fn input(&self, name: &str) -> Option<Arc<InRunner>> {
        read(&self.inputs).get(name).cloned()
    }

    /// A registered filter runner.
    pub fn filter_runner(&self, name: &str) -> Option<Arc<FoRunner>> {
        read(&self.filters).get(name).cloned()
    }

    /// A registered output runner.
    pub fn output_runner(&self, name: &str) -> Option<Arc<FoRunner>> {
        read(&self.outputs).get(name).cloned()
    }

    /// Registered input names, sorted.
    pub fn input_names(&self) -> Vec<String> {
        read(&self.inputs).keys().cloned().collect()
    }

    /// Registered filter names, sorted.
    pub fn filter_names(&self) -> Vec<String> {
        read(&self.filters).keys().cloned().collect()
    }

    /// Registered output names, sorted.
    pub fn output_names(&self) -> Vec<String> {
        read(&self.outputs).keys().cloned().collect()
    }

    /// Full names of encoders handed out so far.
    pub fn encoder_names(&self) -> Vec<String> {
        let mut names: Vec<String> = read(&self.encoders).keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Decoder runners currently running.
    pub fn decoder_runner_count(&self) -> usize {
        read(&self.decoders).len()
    }

    /// Start every registered runner: outputs, then filters, then inputs.
    ///
    /// A runner that fails to start is logged and dropped; the first such
    /// error is returned once the rest have started. Later calls do nothing.
    pub fn start(&self) -> Result<(), SluiceError> {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("pipeline already started");
            return Ok(());
        }
        let mut first_error = None;

        for runner in values(&self.outputs) {
            if let Err(err) = self.start_output(&runner) {
                write(&self.outputs).remove(runner.name());
                self.record(err.to_string());
                first_error.get_or_insert(err);
            }
        }
        for runner in values(&self.filters) {
            if let Err(err) = self.start_filter(&runner) {
                write(&self.filters).remove(runner.name());
                self.record(err.to_string());
                first_error.get_or_insert(err);
            }
        }
        for runner in values(&self.inputs) {
            if let Err(err) = runner.start(self, &self.input_tasks) {
                write(&self.inputs).remove(runner.name());
                self.record(err.to_string());
                first_error.get_or_insert(err);
            }
        }

        info!(
            inputs = read(&self.inputs).len(),
            filters = read(&self.filters).len(),
            outputs = read(&self.outputs).len(),
            "pipeline started"
        );
        first_error.map_or(Ok(()), Err)
    }

    fn start_filter(&self, runner: &Arc<FoRunner>) -> Result<(), SluiceError> {
        runner.start(self, &self.filter_tasks)?;
        self.ctx
            .router
            .add_filter_matcher(Arc::clone(runner.match_runner()));
        Ok(())
    }

    fn start_output(&self, runner: &Arc<FoRunner>) -> Result<(), SluiceError> {
        runner.start(self, &self.output_tasks)?;
        self.ctx
            .router
            .add_output_matcher(Arc::clone(runner.match_runner()));
        Ok(())
    }

    /// True once shutdown has begun or been requested by a failed runner.
    pub fn is_shutting_down(&self) -> bool {
        self.stopping.load(Ordering::SeqCst) || self.ctx.shutdown.is_cancelled()
    }

    /// Resolves when a runner asks for the pipeline to stop.
    pub async fn shutdown_requested(&self) {
        self.ctx.shutdown.cancelled().await;
    }

    /// Stop everything, draining producers before consumers.
    pub async fn shutdown(&self) {
        if self.stopping.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("shutting down pipeline");
        self.ctx.shutdown.cancel();

        for runner in values(&self.inputs) {
            runner.stop();
        }
        self.input_tasks.close();
        self.input_tasks.wait().await;
        debug!("inputs stopped");

        for runner in read(&self.decoders).iter() {
            runner.close();
        }
        self.decoder_tasks.close();
        self.decoder_tasks.wait().await;
        debug!("decoders stopped");

        for name in self.filter_names() {
            self.ctx.router.remove_filter_matcher(&name);
        }
        self.filter_tasks.close();
        self.filter_tasks.wait().await;
        debug!("filters stopped");

        for name in self.output_names() {
            self.ctx.router.remove_output_matcher(&name);
        }
        self.output_tasks.close();
        self.output_tasks.wait().await;
        debug!("outputs stopped");

        // Plugins holding the helper keep the pipeline alive through these.
        write(&self.inputs).clear();
        write(&self.filters).clear();
        write(&self.outputs).clear();
        write(&self.decoders).clear();
        write(&self.encoders).clear();
        write(&self.makers).clear();
        info!("pipeline stopped");
    }

    /// Start a filter runner and attach it to the router. Names must be
    /// unique among live filters.
    pub fn add_filter_runner(&self, runner: Arc<FoRunner>) -> Result<(), SluiceError> {
        ensure_unique(&self.filters, PluginCategory::Filter, runner.name())?;
        self.start_filter(&runner)?;
        write(&self.filters).insert(runner.name().to_string(), runner);
        Ok(())
    }

    /// Detach a filter from the router, which closes its channel and lets
    /// it drain and exit. Refused while shutting down.
    pub fn remove_filter_runner(&self, name: &str) -> bool {
        if self.is_shutting_down() {
            warn!(filter = %name, "not removing filter while shutting down");
            return false;
        }
        let mut filters = write(&self.filters);
        if filters.remove(name).is_none() {
            return false;
        }
        self.ctx.router.remove_filter_matcher(name);
        info!(filter = %name, "removed filter");
        true
    }

    /// Start an input runner. Names must be unique among live inputs.
    pub fn add_input_runner(&self, runner: Arc<InRunner>) -> Result<(), SluiceError> {
        ensure_unique(&self.inputs, PluginCategory::Input, runner.name())?;
        runner.start(self, &self.input_tasks)?;
        write(&self.inputs).insert(runner.name().to_string(), runner);
        Ok(())
    }

    /// Forget an input and its maker, then stop it. Returns whether the
    /// input was registered.
    pub fn remove_input_runner(&self, runner: &Arc<InRunner>) -> bool {
        let name = runner.name();
        if let Some(makers) = write(&self.makers).get_mut(&PluginCategory::Input) {
            makers.remove(name);
        }
        let removed = write(&self.inputs).remove(name).is_some();

        runner.stop();
        if let Some(decoder) = runner.decoder_runner() {
            self.stop_decoder_runner(&decoder);
        }
        info!(input = %name, "removed input");
        removed
    }

    /// Start an output runner and attach it to the router. Names must be
    /// unique among live outputs.
    pub fn add_output_runner(&self, runner: Arc<FoRunner>) -> Result<(), SluiceError> {
        ensure_unique(&self.outputs, PluginCategory::Output, runner.name())?;
        self.start_output(&runner)?;
        write(&self.outputs).insert(runner.name().to_string(), runner);
        Ok(())
    }

    /// Detach an output from the router and forget it and its maker.
    pub fn remove_output_runner(&self, runner: &Arc<FoRunner>) -> bool {
        let name = runner.name();
        if let Some(makers) = write(&self.makers).get_mut(&PluginCategory::Output) {
            makers.remove(name);
        }
        self.ctx.router.remove_output_matcher(name);
        let removed = write(&self.outputs).remove(name).is_some();
        info!(output = %name, "removed output");
        removed
    }
}

#[async_trait]
impl PluginHelper for Pipeline {
    fn output(&self, name: &str) -> Option<Arc<dyn OutputRunner>> {
        let runner = read(&self.outputs).get(name).cloned()?;
        Some(runner)
    }

    fn filter(&self, name: &str) -> Option<Arc<dyn FilterRunner>> {
        let runner = read(&self.filters).get(name).cloned()?;
        Some(runner)
    }

    fn decoder(&self, name: &str) -> Option<Box<dyn Decoder>> {
        let maker = self.maker(PluginCategory::Decoder, name)?;
        match maker.make() {
            Ok(handle) => handle.into_decoder(),
            Err(err) => {
                warn!(decoder = %name, error = %err, "can't create decoder");
                None
            }
        }
    }

    fn encoder(&self, base_name: &str, full_name: &str) -> Option<Arc<dyn Encoder>> {
        let maker = self.maker(PluginCategory::Encoder, base_name)?;
        let mut handle = match maker.make() {
            Ok(handle) => handle,
            Err(err) => {
                self.record(format!("Error creating encoder '{full_name}': {err}"));
                return None;
            }
        };
        if let Some(target) = handle.wants_name() {
            target.set_name(full_name);
        }
        let encoder: Arc<dyn Encoder> = Arc::from(handle.into_encoder()?);
        write(&self.encoders).insert(full_name.to_string(), Arc::clone(&encoder));
        Some(encoder)
    }

    fn decoder_runner(&self, base_name: &str, full_name: &str) -> Option<Arc<dyn DecoderRunner>> {
        let maker = self.maker(PluginCategory::Decoder, base_name)?;
        let runner = match maker.make_runner(Some(full_name), &self.ctx) {
            Ok(RunnerHandle::Decoder(runner)) => runner,
            Ok(_) => return None,
            Err(err) => {
                warn!(decoder = %full_name, error = %err, "can't create decoder runner");
                return None;
            }
        };
        if let Err(err) = runner.start(Arc::clone(&self.ctx.router), &self.decoder_tasks) {
            warn!(decoder = %full_name, error = %err, "can't start decoder runner");
            return None;
        }
        write(&self.decoders).push(Arc::clone(&runner));
        Some(runner)
    }

    fn stop_decoder_runner(&self, runner: &Arc<dyn DecoderRunner>) -> bool {
        let mut decoders = write(&self.decoders);
        let Some(index) = decoders
            .iter()
            .position(|candidate| std::ptr::addr_eq(Arc::as_ptr(candidate), Arc::as_ptr(runner)))
        else {
            return false;
        };
        let removed = decoders.remove(index);
        removed.close();
        true
    }

    fn hostname(&self) -> &str {
        &self.ctx.hostname
    }

    async fn pipeline_pack(&self, msg_loop_count: u32) -> Option<Envelope> {
        self.acquire_envelope(msg_loop_count).await
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("inputs", &self.input_names())
            .field("filters", &self.filter_names())
            .field("outputs", &self.output_names())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}

fn ensure_unique<T>(
    map: &RwLock<BTreeMap<String, T>>,
    category: PluginCategory,
    name: &str,
) -> Result<(), SluiceError> {
    if read(map).contains_key(name) {
        return Err(SluiceError::DuplicateRunner {
            category,
            name: name.to_string(),
        });
    }
    Ok(())
}

fn values<T: Clone>(map: &RwLock<BTreeMap<String, T>>) -> Vec<T> {
    read(map).values().cloned().collect()
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
