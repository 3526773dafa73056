use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// 驅動 extract/transform/load 三階段的執行引擎
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    /// 監控開啟時，每個階段結束都會記錄系統資源用量
    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting query post-processing");

        let exports = self.pipeline.extract().await?;
        tracing::info!("📋 Extracted {} scenario exports", exports.len());
        self.monitor.log_phase("Extract finished");

        let result = self.pipeline.transform(exports).await?;
        tracing::info!(
            "✅ Transformed {} tables ({} diff tables)",
            result.tables.len(),
            result.diffs.len()
        );
        self.monitor.log_phase("Transform finished");

        let output_path = self.pipeline.load(result).await?;
        tracing::info!("💾 Output saved to: {}", output_path);
        self.monitor.log_phase("Load finished");

        Ok(output_path)
    }
}
