//! 问题检测器 - 业务能力层
//!
//! 驱动页面扫描的调度器，三个触发源写入同一条"需要扫描"的通道：
//! 1. DOM 变更（防抖，最后一次变更生效）
//! 2. 周期性兜底扫描（页面变化但探针听不到时的保底）
//! 3. 启动后的一次性首扫（等页面自身渲染完成）
//!
//! 去重规则：扫描结果与上一个已接受的问题逐字符相等时不触发任何回调；
//! 新问题出现时按注册顺序同步调用所有回调，单个回调失败只记日志。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::infrastructure::DomBridge;
use crate::models::DetectionContext;
use crate::services::scanner::PageScanner;
use crate::utils::logging::truncate_text;

/// 问题检测回调
///
/// 可失败；失败被逐个捕获记录，不影响其他回调和后续扫描。
pub type DetectionCallback =
    Box<dyn Fn(&str, &DetectionContext) -> anyhow::Result<()> + Send + Sync>;

/// 检测调度参数
#[derive(Debug, Clone)]
pub struct DetectorTiming {
    /// DOM 变更后的防抖延迟
    pub debounce: Duration,
    /// 周期性兜底扫描间隔
    pub periodic: Duration,
    /// 启动后首次扫描的延迟
    pub initial_delay: Duration,
    /// 变更探针轮询间隔
    pub poll: Duration,
}

impl DetectorTiming {
    pub fn from_config(config: &Config) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            periodic: Duration::from_secs(config.periodic_secs),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            poll: Duration::from_millis(config.mutation_poll_ms),
        }
    }
}

/// 问题检测器
///
/// 职责：
/// - 管理 `idle` / `monitoring` 两个状态
/// - 持有"当前问题"和"上一个已接受的问题"
/// - 扫描、去重、构建上下文、分发回调
/// - stop() 同步取消所有定时任务，返回后不再有任何回调
pub struct QuestionDetector {
    scanner: Arc<PageScanner>,
    dom: Arc<dyn DomBridge>,
    timing: DetectorTiming,
    monitoring: AtomicBool,
    current_question: Mutex<Option<String>>,
    last_question: Mutex<Option<String>>,
    callbacks: Mutex<Vec<DetectionCallback>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl QuestionDetector {
    /// 创建新的问题检测器
    pub fn new(scanner: Arc<PageScanner>, dom: Arc<dyn DomBridge>, timing: DetectorTiming) -> Self {
        Self {
            scanner,
            dom,
            timing,
            monitoring: AtomicBool::new(false),
            current_question: Mutex::new(None),
            last_question: Mutex::new(None),
            callbacks: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// 注册问题检测回调（在 start 之前调用）
    ///
    /// 分发顺序 = 注册顺序。
    pub fn on_question<F>(&self, callback: F)
    where
        F: Fn(&str, &DetectionContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.callbacks.lock().unwrap().push(Box::new(callback));
    }

    /// 当前问题（最近一次被接受的）
    pub fn current_question(&self) -> Option<String> {
        self.current_question.lock().unwrap().clone()
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::SeqCst)
    }

    /// 开始监测
    ///
    /// 重复调用是幂等的。
    pub fn start(self: &Arc<Self>) {
        if self.monitoring.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("👁️ 开始监测页面问题");

        let (change_tx, change_rx) = mpsc::channel::<()>(16);

        let mut tasks = self.tasks.lock().unwrap();
        tasks.push(self.spawn_change_poller(change_tx));
        tasks.push(self.spawn_debouncer(change_rx));
        tasks.push(self.spawn_periodic());
        tasks.push(self.spawn_initial_scan());
    }

    /// 停止监测
    ///
    /// 同步取消所有定时任务；本函数返回后不再有回调被调用。
    pub fn stop(&self) {
        if !self.monitoring.swap(false, Ordering::SeqCst) {
            return;
        }
        for handle in self.tasks.lock().unwrap().drain(..) {
            handle.abort();
        }
        info!("🛑 停止监测");
    }

    /// 变更探针轮询任务：脏标记 → 变更通道
    fn spawn_change_poller(self: &Arc<Self>, change_tx: mpsc::Sender<()>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = this.dom.install_change_probe().await {
                warn!("变更探针安装失败，仅靠周期扫描兜底: {}", e);
                return;
            }
            loop {
                sleep(this.timing.poll).await;
                if !this.is_monitoring() {
                    break;
                }
                match this.dom.take_dirty().await {
                    Ok(true) => {
                        let _ = change_tx.send(()).await;
                    }
                    Ok(false) => {}
                    Err(e) => debug!("读取脏标记失败: {}", e),
                }
            }
        })
    }

    /// 防抖任务：变更事件休止 debounce 时长后才扫描，
    /// 新事件到来会重置计时（最后一次变更生效）。
    fn spawn_debouncer(self: &Arc<Self>, mut change_rx: mpsc::Receiver<()>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            while change_rx.recv().await.is_some() {
                loop {
                    tokio::select! {
                        _ = sleep(this.timing.debounce) => {
                            this.detect_once().await;
                            break;
                        }
                        more = change_rx.recv() => {
                            if more.is_none() {
                                return;
                            }
                            // 计时重置，继续等待
                        }
                    }
                }
            }
        })
    }

    /// 周期性兜底扫描任务
    fn spawn_periodic(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.timing.periodic);
            // interval 的第一次 tick 立即返回，先消费掉
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !this.is_monitoring() {
                    break;
                }
                this.detect_once().await;
            }
        })
    }

    /// 启动后的一次性首扫任务
    fn spawn_initial_scan(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            sleep(this.timing.initial_delay).await;
            this.detect_once().await;
        })
    }

    /// 执行一次"扫描 → 去重 → 分发"
    ///
    /// 三个触发源最终都汇聚到这里。
    pub async fn detect_once(&self) {
        if !self.is_monitoring() {
            return;
        }

        let scanned = match self.scanner.scan().await {
            Ok(scanned) => scanned,
            Err(e) => {
                warn!("页面扫描失败: {}", e);
                return;
            }
        };

        let Some(question) = scanned else {
            return;
        };

        // 与上一个已接受的问题相同则不做任何事
        {
            let last = self.last_question.lock().unwrap();
            if last.as_deref() == Some(question.as_str()) {
                return;
            }
        }

        *self.current_question.lock().unwrap() = Some(question.clone());
        *self.last_question.lock().unwrap() = Some(question.clone());
        info!("🔔 检测到新问题: {}", truncate_text(&question, 80));

        let context = self.scanner.build_context().await;

        // stop() 之后不再分发（扫描可能在 stop 时已经在途）
        if !self.is_monitoring() {
            debug!("监测已停止，丢弃在途的检测结果");
            return;
        }

        let callbacks = self.callbacks.lock().unwrap();
        for (index, callback) in callbacks.iter().enumerate() {
            if let Err(e) = callback(&question, &context) {
                error!("问题回调 {} 执行失败: {}", index, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::TextClassifier;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// 调度参数拉到很长，让测试完全由手动 detect_once 驱动
    fn inert_timing() -> DetectorTiming {
        DetectorTiming {
            debounce: Duration::from_secs(600),
            periodic: Duration::from_secs(600),
            initial_delay: Duration::from_secs(600),
            poll: Duration::from_secs(600),
        }
    }

    /// 每次扫描返回当前设定文本的假页面
    #[derive(Default)]
    struct SeqDom {
        current: Mutex<Option<String>>,
    }

    #[async_trait]
    impl DomBridge for SeqDom {
        async fn query_texts(&self, _selector: &str) -> Result<Vec<String>> {
            Ok(self.current.lock().unwrap().clone().into_iter().collect())
        }
        async fn first_visible_text(&self, _selector: &str) -> Result<Option<String>> {
            Ok(None)
        }
        async fn any_visible(&self, _selector: &str) -> Result<bool> {
            Ok(false)
        }
        async fn page_url(&self) -> Result<String> {
            Ok("https://app.hirevue.com/x".to_string())
        }
        async fn install_change_probe(&self) -> Result<()> {
            Ok(())
        }
        async fn take_dirty(&self) -> Result<bool> {
            Ok(false)
        }
    }

    /// 扫描会阻塞在门闩上的假页面，用于模拟在途扫描
    struct GatedDom {
        gate: Notify,
        entered: AtomicBool,
    }

    #[async_trait]
    impl DomBridge for GatedDom {
        async fn query_texts(&self, _selector: &str) -> Result<Vec<String>> {
            // 只有第一次调用（在途扫描）会阻塞在门闩上
            if !self.entered.swap(true, Ordering::SeqCst) {
                self.gate.notified().await;
            }
            Ok(vec!["What is your greatest strength?".to_string()])
        }
        async fn first_visible_text(&self, _selector: &str) -> Result<Option<String>> {
            Ok(None)
        }
        async fn any_visible(&self, _selector: &str) -> Result<bool> {
            Ok(false)
        }
        async fn page_url(&self) -> Result<String> {
            Ok("https://app.hirevue.com/x".to_string())
        }
        async fn install_change_probe(&self) -> Result<()> {
            Ok(())
        }
        async fn take_dirty(&self) -> Result<bool> {
            Ok(false)
        }
    }

    fn detector_with(dom: Arc<dyn DomBridge>) -> Arc<QuestionDetector> {
        let scanner = Arc::new(
            PageScanner::new(Arc::clone(&dom), TextClassifier::new().unwrap()).unwrap(),
        );
        Arc::new(QuestionDetector::new(scanner, dom, inert_timing()))
    }

    #[tokio::test]
    async fn test_sequence_fires_once_per_distinct_question() {
        let dom = Arc::new(SeqDom::default());
        let detector = detector_with(dom.clone());

        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);
        detector.on_question(move |q, _ctx| {
            seen_cb.lock().unwrap().push(q.to_string());
            Ok(())
        });

        detector.start();

        // 扫描序列 [None, A, A, B, B]
        let sequence = [
            None,
            Some("What is your biggest weakness?"),
            Some("What is your biggest weakness?"),
            Some("Why do you want this job?"),
            Some("Why do you want this job?"),
        ];
        for step in sequence {
            *dom.current.lock().unwrap() = step.map(|s| s.to_string());
            detector.detect_once().await;
        }
        detector.stop();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                "What is your biggest weakness?".to_string(),
                "Why do you want this job?".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_callbacks_run_in_registration_order_despite_failure() {
        let dom = Arc::new(SeqDom::default());
        *dom.current.lock().unwrap() = Some("Tell me about yourself please".to_string());
        let detector = detector_with(dom);

        let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let o1 = Arc::clone(&order);
        detector.on_question(move |_q, _ctx| {
            o1.lock().unwrap().push("first");
            anyhow::bail!("第一个回调故意失败")
        });
        let o2 = Arc::clone(&order);
        detector.on_question(move |_q, _ctx| {
            o2.lock().unwrap().push("second");
            Ok(())
        });

        detector.start();
        detector.detect_once().await;
        detector.stop();

        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_no_callback_without_start() {
        let dom = Arc::new(SeqDom::default());
        *dom.current.lock().unwrap() = Some("What is your biggest weakness?".to_string());
        let detector = detector_with(dom);

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_cb = Arc::clone(&fired);
        detector.on_question(move |_q, _ctx| {
            fired_cb.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        // 未 start，detect_once 直接返回
        detector.detect_once().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_suppresses_inflight_scan() {
        let dom = Arc::new(GatedDom {
            gate: Notify::new(),
            entered: AtomicBool::new(false),
        });
        let detector = detector_with(dom.clone());

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_cb = Arc::clone(&fired);
        detector.on_question(move |_q, _ctx| {
            fired_cb.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        detector.start();
        let inflight = {
            let detector = Arc::clone(&detector);
            tokio::spawn(async move { detector.detect_once().await })
        };

        // 等扫描真正进入在途状态
        while !dom.entered.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }

        detector.stop();
        dom.gate.notify_one();
        inflight.await.unwrap();

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_current_question_tracks_latest() {
        let dom = Arc::new(SeqDom::default());
        let detector = detector_with(dom.clone());
        detector.start();

        assert_eq!(detector.current_question(), None);
        *dom.current.lock().unwrap() = Some("How do you handle conflict?".to_string());
        detector.detect_once().await;
        assert_eq!(
            detector.current_question().as_deref(),
            Some("How do you handle conflict?")
        );
        detector.stop();
    }
}
