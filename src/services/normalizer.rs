//! 内容压缩服务 - 业务能力层
//!
//! 只负责把 DOCX 路径产出的富文本 HTML 压缩成紧凑、保结构的文本，
//! 不关心流程。其他提取路径（纯文本 / 二进制）不经过这一步。
//!
//! 所有步骤幂等：`normalize(normalize(x)) == normalize(x)`。
//! 剥除标签只删标记本身，内部文本全部保留。

use regex::Regex;

/// 保留的标签集合（表格结构、段落、强调、换行）
///
/// 下游分析依赖这些结构线索判断题目边界和矩阵表格，其余标记
/// 一律剥除。
static RETAINED_TAGS: phf::Set<&'static str> = phf::phf_set! {
    "table", "tr", "td", "p", "strong", "b", "i", "br",
};

/// 内容压缩服务
///
/// 职责：
/// - 压缩 DOCX 富文本，降低请求体大小
/// - 保留表格 / 强调 / 题目边界等结构线索
/// - 不读文件、不发请求、不关心流程顺序
pub struct ContentNormalizer {
    img_tag: Regex,
    style_attr: Regex,
    class_attr: Regex,
    empty_paragraph: Regex,
    whitespace_run: Regex,
    any_tag: Regex,
}

impl ContentNormalizer {
    pub fn new() -> Self {
        // 这些模式都是固定字面量，编译失败属于编程错误而非运行时输入问题
        Self {
            img_tag: Regex::new(r"<img[^>]*>").unwrap(),
            style_attr: Regex::new(r#"\s*style="[^"]*""#).unwrap(),
            class_attr: Regex::new(r#"\s*class="[^"]*""#).unwrap(),
            empty_paragraph: Regex::new(r"<p>\s*</p>").unwrap(),
            whitespace_run: Regex::new(r"\s\s+").unwrap(),
            any_tag: Regex::new(r"</?([a-zA-Z][a-zA-Z0-9]*)[^>]*>").unwrap(),
        }
    }

    /// 压缩富文本 HTML
    ///
    /// 单趟步骤见 [`pass`](Self::pass)。剥除标签可能让新的空段落 /
    /// 空白串露出来（例如 `<p>&nbsp;</p>`），所以整趟迭代到不动点
    /// 为止——每次有效改写都严格缩短字符串，必然终止，由此保证
    /// `normalize(normalize(x)) == normalize(x)`。
    pub fn normalize(&self, html: &str) -> String {
        let mut current = self.pass(html);
        loop {
            let next = self.pass(&current);
            if next == current {
                return next;
            }
            current = next;
        }
    }

    /// 单趟压缩
    ///
    /// 1. 删除图片元素
    /// 2. 剥除内联 style / class 属性
    /// 3. 折叠空段落
    /// 4. HTML 空格实体与空白串折叠为单个空格
    /// 5. 剥除白名单之外的标签（保留内部文本）
    /// 6. 去除首尾空白
    fn pass(&self, html: &str) -> String {
        let stripped = self.img_tag.replace_all(html, "");
        let stripped = self.style_attr.replace_all(&stripped, "");
        let stripped = self.class_attr.replace_all(&stripped, "");
        let stripped = self.empty_paragraph.replace_all(&stripped, "");
        let stripped = stripped.replace("&nbsp;", " ");
        let stripped = self.whitespace_run.replace_all(&stripped, " ");

        // regex crate 不支持负向先行断言，白名单判断放在替换闭包里：
        // 命中保留集的标签原样保留，其余只留内部文本
        let stripped = self
            .any_tag
            .replace_all(&stripped, |caps: &regex::Captures<'_>| {
                let name = caps[1].to_lowercase();
                if RETAINED_TAGS.contains(name.as_str()) {
                    caps[0].to_string()
                } else {
                    String::new()
                }
            });

        stripped.trim().to_string()
    }
}

impl Default for ContentNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
