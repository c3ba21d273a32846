use crate::{
    AbortResult, Action, ActionContext, ActionDef, FinishHandle, StartResult, WorldKey,
};

type VerifyFn<K> = Box<dyn Fn(&ActionContext<'_, K>) -> bool>;
type StartFn<K> = Box<dyn FnMut(&mut ActionContext<'_, K>, FinishHandle) -> StartResult>;
type TickFn<K> = Box<dyn FnMut(&mut ActionContext<'_, K>)>;
type AbortFn<K> = Box<dyn FnMut(&mut ActionContext<'_, K>)>;

/// An action whose behavior is supplied as callbacks by the host (scripts, tools, tests).
///
/// - No start callback: the action fails to start.
/// - No abort callback: the abort completes synchronously.
/// - With an abort callback: the abort is asynchronous; the script must keep the
///   [`FinishHandle`] it was started with and finish it with `Aborted` when done.
/// - No verify callback: the context always verifies.
pub struct ScriptedAction<K: WorldKey> {
    def: ActionDef<K>,
    verify: Option<VerifyFn<K>>,
    on_start: Option<StartFn<K>>,
    on_tick: Option<TickFn<K>>,
    on_abort: Option<AbortFn<K>>,
}

impl<K: WorldKey> ScriptedAction<K> {
    pub fn new(def: ActionDef<K>) -> Self {
        Self {
            def,
            verify: None,
            on_start: None,
            on_tick: None,
            on_abort: None,
        }
    }

    pub fn with_verify(mut self, verify: impl Fn(&ActionContext<'_, K>) -> bool + 'static) -> Self {
        self.verify = Some(Box::new(verify));
        self
    }

    pub fn on_start(
        mut self,
        start: impl FnMut(&mut ActionContext<'_, K>, FinishHandle) -> StartResult + 'static,
    ) -> Self {
        self.on_start = Some(Box::new(start));
        self
    }

    pub fn on_tick(mut self, tick: impl FnMut(&mut ActionContext<'_, K>) + 'static) -> Self {
        self.on_tick = Some(Box::new(tick));
        self
    }

    pub fn on_abort(mut self, abort: impl FnMut(&mut ActionContext<'_, K>) + 'static) -> Self {
        self.on_abort = Some(Box::new(abort));
        self
    }
}

impl<K: WorldKey> Action<K> for ScriptedAction<K> {
    fn def(&self) -> &ActionDef<K> {
        &self.def
    }

    fn verify_context(&self, ctx: &ActionContext<'_, K>) -> bool {
        self.verify.as_ref().map_or(true, |verify| verify(ctx))
    }

    fn start(&mut self, ctx: &mut ActionContext<'_, K>, finish: FinishHandle) -> StartResult {
        match self.on_start.as_mut() {
            Some(start) => start(ctx, finish),
            None => StartResult::Failed,
        }
    }

    fn tick(&mut self, ctx: &mut ActionContext<'_, K>) {
        if let Some(tick) = self.on_tick.as_mut() {
            tick(ctx);
        }
    }

    fn abort(&mut self, ctx: &mut ActionContext<'_, K>) -> AbortResult {
        match self.on_abort.as_mut() {
            Some(abort) => {
                abort(ctx);
                AbortResult::Running
            }
            None => AbortResult::Aborted,
        }
    }
}
