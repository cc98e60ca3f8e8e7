//! Server-side HTML for rendered forms.

use handlebars::Handlebars;
use serde_json::{Value, json};

use crate::error::Result;
use crate::widget::{FormView, RenderedField};

const FIELD: &str = r#"<div class="form-field{{#if error}} form-field-invalid{{/if}}" data-field-type="{{fieldType}}">
{{#if label}}<label for="{{name}}" class="shad-input-label">{{label}}</label>
{{/if}}{{{control}}}
{{#if error}}<p class="shad-error" id="{{name}}-error">{{error}}</p>
{{/if}}</div>"#;

const TEXT_INPUT: &str = r#"<div class="input-wrapper">{{#if widget.icon}}<img src="{{widget.icon.src}}" alt="{{widget.icon.alt}}" width="24" height="24" class="input-icon">{{/if}}<input type="text" id="{{name}}" name="{{name}}" value="{{widget.value}}"{{#if widget.placeholder}} placeholder="{{widget.placeholder}}"{{/if}}{{#if widget.disabled}} disabled{{/if}}{{#if invalid}} aria-invalid="true"{{/if}} class="shad-input"></div>"#;

const TEXT_AREA: &str = r#"<textarea id="{{name}}" name="{{name}}"{{#if widget.placeholder}} placeholder="{{widget.placeholder}}"{{/if}}{{#if widget.disabled}} disabled{{/if}}{{#if invalid}} aria-invalid="true"{{/if}} class="shad-textArea">{{widget.value}}</textarea>"#;

const PHONE_INPUT: &str = r#"<input type="tel" id="{{name}}" name="{{name}}" value="{{widget.value}}"{{#if widget.placeholder}} placeholder="{{widget.placeholder}}"{{/if}} data-default-country="{{widget.defaultCountry}}"{{#if widget.international}} data-international{{/if}}{{#if widget.disabled}} disabled{{/if}}{{#if invalid}} aria-invalid="true"{{/if}} class="input-phone">"#;

const CHECKBOX: &str = r#"<div class="checkbox-wrapper"><input type="checkbox" id="{{name}}" name="{{name}}" value="on"{{#if widget.checked}} checked{{/if}}{{#if widget.disabled}} disabled{{/if}}><label for="{{name}}" class="checkbox-label">{{widget.label}}</label></div>"#;

const DATE_PICKER: &str = r#"<input type="{{#if widget.showTimeSelect}}datetime-local{{else}}date{{/if}}" id="{{name}}" name="{{name}}" value="{{widget.value}}" data-date-format="{{widget.dateFormat}}"{{#if widget.display}} title="{{widget.display}}"{{/if}}{{#if widget.disabled}} disabled{{/if}}{{#if invalid}} aria-invalid="true"{{/if}} class="date-picker">"#;

const SELECT: &str = r#"<select id="{{name}}" name="{{name}}"{{#if widget.disabled}} disabled{{/if}} class="shad-select-trigger">{{#if widget.placeholder}}<option value="">{{widget.placeholder}}</option>{{/if}}{{#each widget.options}}<option value="{{value}}"{{#if selected}} selected{{/if}}{{#if image}} data-image="{{image}}"{{/if}}>{{label}}</option>{{/each}}</select>"#;

const RADIO_GROUP: &str = r#"<div class="radio-group-wrapper" role="radiogroup">{{#each widget.options}}<div class="radio-group"><input type="radio" id="{{@root.name}}-{{value}}" name="{{@root.name}}" value="{{value}}"{{#if selected}} checked{{/if}}{{#if @root.widget.disabled}} disabled{{/if}}><label for="{{@root.name}}-{{value}}">{{label}}</label></div>{{/each}}</div>"#;

const FILE_UPLOADER: &str = r#"<div class="file-upload">{{#if widget.fileName}}<p class="file-upload-current">{{widget.fileName}}</p>{{/if}}<input type="file" id="{{name}}" name="{{name}}" accept="{{widget.accept}}"{{#if widget.disabled}} disabled{{/if}}><p class="file-upload-hint">{{widget.hint}}</p></div>"#;

const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{{title}} | CarePulse</title></head>
<body>
<main class="form-page">
<form method="post" action="{{action}}"{{#if multipart}} enctype="multipart/form-data"{{/if}} class="space-y-12 flex-1" data-form="{{formId}}">
<section class="space-y-4"><h1 class="header">{{title}}</h1><p class="text-dark-700">{{subtitle}}</p></section>
{{#if formError}}<div class="form-error" role="alert">{{formError}}</div>
{{/if}}<input type="hidden" name="sessionId" value="{{sessionId}}">
{{#each sections}}<section class="space-y-6">{{#if title}}<h2 class="sub-header">{{title}}</h2>{{/if}}
{{#each rows}}<div class="flex flex-col gap-6 xl:flex-row">
{{#each this}}{{{this}}}
{{/each}}</div>
{{/each}}</section>
{{/each}}<button type="submit" class="shad-primary-btn w-full"{{#if submitDisabled}} disabled{{/if}}>{{submitLabel}}</button>
</form>
</main>
</body>
</html>
"#;

const MESSAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{{title}} | CarePulse</title></head>
<body>
<main class="message-page"><h1 class="header">{{title}}</h1><p class="text-dark-700">{{body}}</p>{{#if link}}<a href="{{link.href}}">{{link.label}}</a>{{/if}}</main>
</body>
</html>
"#;

/// Handlebars renderer with one template per widget kind plus the page
/// layouts.
pub struct HtmlRenderer {
    handlebars: Handlebars<'static>,
}

impl HtmlRenderer {
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        for (name, template) in [
            ("field", FIELD),
            ("text_input", TEXT_INPUT),
            ("text_area", TEXT_AREA),
            ("phone_input", PHONE_INPUT),
            ("checkbox", CHECKBOX),
            ("date_picker", DATE_PICKER),
            ("select", SELECT),
            ("radio_group", RADIO_GROUP),
            ("file_uploader", FILE_UPLOADER),
            ("page", PAGE),
            ("message", MESSAGE),
        ] {
            handlebars.register_template_string(name, template)?;
        }
        Ok(Self { handlebars })
    }

    /// HTML of one field: label, control and error message.
    pub fn render_field(&self, field: &RenderedField) -> Result<String> {
        let control = self.handlebars.render(
            field.widget.template_name(),
            &json!({
                "name": field.name,
                "widget": field.widget,
                "invalid": field.error.is_some(),
            }),
        )?;
        let html = self.handlebars.render(
            "field",
            &json!({
                "name": field.name,
                "fieldType": field.field_type,
                "label": field.label,
                "error": field.error,
                "control": control,
            }),
        )?;
        Ok(html)
    }

    /// Full HTML page of a form.
    pub fn render_form(&self, view: &FormView) -> Result<String> {
        let mut sections = Vec::with_capacity(view.sections.len());
        for section in &view.sections {
            let mut rows = Vec::with_capacity(section.rows.len());
            for row in &section.rows {
                let fields = row
                    .iter()
                    .map(|field| self.render_field(field))
                    .collect::<Result<Vec<_>>>()?;
                rows.push(Value::from(fields));
            }
            sections.push(json!({ "title": section.title, "rows": rows }));
        }

        let mut data = serde_json::to_value(view).map_err(carepulse_core::CoreError::from)?;
        data["sections"] = Value::from(sections);
        Ok(self.handlebars.render("page", &data)?)
    }

    /// Simple page with a heading, a paragraph and an optional link.
    pub fn render_message(&self, title: &str, body: &str, link: Option<(&str, &str)>) -> Result<String> {
        let link = link.map(|(href, label)| json!({ "href": href, "label": label }));
        Ok(self.handlebars.render(
            "message",
            &json!({ "title": title, "body": body, "link": link }),
        )?)
    }
}

impl std::fmt::Debug for HtmlRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlRenderer")
            .field("templates", &self.handlebars.get_templates().len())
            .finish()
    }
}
