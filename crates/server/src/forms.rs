//! # フォーム検証
//!
//! 投入フォーム（`UploadSignatureForm`）と種別追加フォーム（`NewSignatureTypeForm`）。
//! 検証に失敗したフォームは `as_table()` で入力値とエラーを含むHTML行に描画できる。

use std::collections::HashMap;

use crate::render::escape;

/// urlencodedフォームの生データ
pub type FormData = HashMap<String, String>;

const REQUIRED: &str = "This field is required.";

#[derive(Debug, Clone)]
enum Widget {
    Text,
    TextArea,
    Select(Vec<String>),
    Checkbox,
}

#[derive(Debug, Clone)]
struct Field {
    name: &'static str,
    label: &'static str,
    required: bool,
    widget: Widget,
}

impl Field {
    fn new(name: &'static str, label: &'static str, required: bool, widget: Widget) -> Self {
        Self {
            name,
            label,
            required,
            widget,
        }
    }
}

/// 入力データを束縛したフォーム。
#[derive(Debug, Clone)]
pub struct BoundForm {
    fields: Vec<Field>,
    data: FormData,
    errors: HashMap<&'static str, Vec<String>>,
}

impl BoundForm {
    fn new(fields: Vec<Field>, data: FormData) -> Self {
        let mut form = Self {
            fields,
            data,
            errors: HashMap::new(),
        };
        form.validate();
        form
    }

    fn validate(&mut self) {
        for field in &self.fields {
            let value = self.data.get(field.name).map(|v| v.trim()).unwrap_or("");
            if value.is_empty() {
                if field.required {
                    self.errors.entry(field.name).or_default().push(REQUIRED.to_string());
                }
                continue;
            }
            if let Widget::Select(choices) = &field.widget {
                if !choices.iter().any(|c| c == value) {
                    self.errors.entry(field.name).or_default().push(format!(
                        "Select a valid choice. {value} is not one of the available choices."
                    ));
                }
            }
        }
    }

    /// エラーが無いかどうか
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// フィールドのエラー一覧
    pub fn errors(&self, name: &str) -> &[String] {
        self.errors.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 前後の空白を除いた値。未入力なら空文字列。
    fn cleaned(&self, name: &str) -> String {
        self.data
            .get(name)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }

    fn raw(&self, name: &str) -> &str {
        self.data.get(name).map(String::as_str).unwrap_or("")
    }

    /// フィールドごとに `<tr><th>label</th><td>errors + widget</td></tr>` を描画する。
    pub fn as_table(&self) -> String {
        let mut out = String::new();
        for field in &self.fields {
            let id = format!("id_{}", field.name);
            out.push_str(&format!(
                "<tr><th><label for=\"{id}\">{}:</label></th><td>",
                field.label
            ));

            let errors = self.errors(field.name);
            if !errors.is_empty() {
                out.push_str("<ul class=\"errorlist\">");
                for e in errors {
                    out.push_str(&format!("<li>{}</li>", escape(e)));
                }
                out.push_str("</ul>");
            }

            let value = escape(self.raw(field.name));
            match &field.widget {
                Widget::Text => {
                    out.push_str(&format!(
                        "<input type=\"text\" name=\"{}\" id=\"{id}\" value=\"{value}\">",
                        field.name
                    ));
                }
                Widget::TextArea => {
                    out.push_str(&format!(
                        "<textarea name=\"{}\" id=\"{id}\">{value}</textarea>",
                        field.name
                    ));
                }
                Widget::Select(choices) => {
                    out.push_str(&format!(
                        "<select name=\"{}\" id=\"{id}\"><option value=\"\">---------</option>",
                        field.name
                    ));
                    for choice in choices {
                        let selected = if self.raw(field.name).trim() == choice {
                            " selected"
                        } else {
                            ""
                        };
                        let choice = escape(choice);
                        out.push_str(&format!(
                            "<option value=\"{choice}\"{selected}>{choice}</option>"
                        ));
                    }
                    out.push_str("</select>");
                }
                Widget::Checkbox => {
                    let checked = if is_checked(self.raw(field.name)) {
                        " checked"
                    } else {
                        ""
                    };
                    out.push_str(&format!(
                        "<input type=\"checkbox\" name=\"{}\" id=\"{id}\"{checked}>",
                        field.name
                    ));
                }
            }
            out.push_str("</td></tr>\n");
        }
        out
    }
}

/// チェックボックスの値を真偽値として解釈する。
pub fn is_checked(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}

/// 検証済みの投入フォーム値。
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFields {
    pub data: String,
    pub source: String,
    pub title: String,
    pub data_type: String,
    pub description: String,
    pub method: String,
    pub reference: String,
    pub bucket_list: Vec<String>,
    pub ticket: Option<String>,
    pub copy_relationships: bool,
}

/// シグネチャ投入フォーム。
///
/// `source` はユーザーに許可されたソース、`data_type` は有効な種別のみ選択可能。
pub struct UploadSignatureForm {
    form: BoundForm,
}

impl UploadSignatureForm {
    pub fn new(sources: &[String], data_types: &[String], data: FormData) -> Self {
        let fields = vec![
            Field::new("title", "Title", true, Widget::Text),
            Field::new("data_type", "Data Type", true, Widget::Select(data_types.to_vec())),
            Field::new("description", "Description", false, Widget::Text),
            Field::new("data", "Data", true, Widget::TextArea),
            Field::new("source", "Source", true, Widget::Select(sources.to_vec())),
            Field::new("method", "Method", false, Widget::Text),
            Field::new("reference", "Reference", false, Widget::Text),
            Field::new("bucket_list", "Bucket List", false, Widget::Text),
            Field::new("ticket", "Ticket", false, Widget::Text),
            Field::new("copy_relationships", "Copy Relationships", false, Widget::Checkbox),
        ];
        Self {
            form: BoundForm::new(fields, data),
        }
    }

    /// 検証済みの値を返す。無効な場合は描画用にフォームを返す。
    pub fn clean(self) -> Result<UploadFields, BoundForm> {
        let form = self.form;
        if !form.is_valid() {
            return Err(form);
        }

        let bucket_list = form
            .cleaned("bucket_list")
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .collect();
        let ticket = Some(form.cleaned("ticket")).filter(|t| !t.is_empty());
        let method = Some(form.cleaned("method"))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Upload".to_string());

        Ok(UploadFields {
            data: form.raw("data").to_string(),
            source: form.cleaned("source"),
            title: form.cleaned("title"),
            data_type: form.cleaned("data_type"),
            description: form.cleaned("description"),
            method,
            reference: form.cleaned("reference"),
            bucket_list,
            ticket,
            copy_relationships: is_checked(form.raw("copy_relationships")),
        })
    }
}

/// シグネチャ種別追加フォーム。
pub struct NewSignatureTypeForm {
    form: BoundForm,
}

impl NewSignatureTypeForm {
    pub fn new(data: FormData) -> Self {
        let fields = vec![Field::new("data_type", "Data Type", true, Widget::Text)];
        Self {
            form: BoundForm::new(fields, data),
        }
    }

    /// 検証済みの種別名を返す。
    pub fn clean(self) -> Result<String, BoundForm> {
        if self.form.is_valid() {
            Ok(self.form.cleaned("data_type"))
        } else {
            Err(self.form)
        }
    }
}
