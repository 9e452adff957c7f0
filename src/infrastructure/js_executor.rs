//! 页面执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"注入内容 / 执行 JS / 打印快照"
//! 三种能力，不认识报告模型，不处理业务流程。

use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// 页面执行器
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 把完整 HTML 文档注入当前页面
    pub async fn set_content(&self, html: impl Into<String>) -> Result<()> {
        self.page.set_content(html.into()).await?;
        Ok(())
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 按给定参数打印当前页面为 PDF 字节流
    pub async fn print_to_pdf(&self, params: PrintToPdfParams) -> Result<Vec<u8>> {
        let bytes = self.page.pdf(params).await?;
        Ok(bytes)
    }
}
