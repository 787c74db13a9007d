use super::{MissionContext, ReportSection};

/// Builds the full draft text from stored section content, walking the plan
/// outline with hierarchical numbering ("1.2.3 Title", heading depth = level).
/// Returns None when the plan or all content is missing.
pub fn build_draft(mission: &MissionContext) -> Option<String> {
    let plan = mission.plan.as_ref()?;
    if mission.report_content.is_empty() {
        return None;
    }

    let mut draft = String::new();
    render_sections(mission, &plan.report_outline, 1, "", &mut draft);
    Some(draft.trim_end().to_string())
}

fn render_sections(
    mission: &MissionContext,
    sections: &[ReportSection],
    level: usize,
    prefix: &str,
    out: &mut String,
) {
    for (i, section) in sections.iter().enumerate() {
        let number = format!("{}{}", prefix, i + 1);
        out.push_str(&format!(
            "{} {}. {}\n\n",
            "#".repeat(level),
            number,
            section.title
        ));
        match mission.report_content.get(&section.section_id) {
            Some(content) => out.push_str(content),
            None => out.push_str(&format!(
                "[Content missing for section {}]",
                section.section_id
            )),
        }
        out.push_str("\n\n");
        if !section.subsections.is_empty() {
            render_sections(
                mission,
                &section.subsections,
                level + 1,
                &format!("{}.", number),
                out,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::{MissionParams, ResearchPlan};

    #[test]
    fn test_hierarchical_numbering() {
        let mut mission = MissionContext::new(MissionParams::new("r"));
        mission.plan = Some(ResearchPlan::new("goal").with_outline(vec![
            ReportSection::new("intro", "Introduction"),
            ReportSection::new("body", "Findings").with_subsections(vec![ReportSection::new(
                "detail",
                "Mechanisms",
            )]),
        ]));
        mission
            .report_content
            .insert("intro".to_string(), "Opening.".to_string());
        mission
            .report_content
            .insert("detail".to_string(), "Deep dive.".to_string());

        let draft = build_draft(&mission).unwrap();
        assert!(draft.contains("# 1. Introduction"));
        assert!(draft.contains("# 2. Findings"));
        assert!(draft.contains("## 2.1. Mechanisms"));
        assert!(draft.contains("[Content missing for section body]"));
        assert!(draft.contains("Deep dive."));
    }

    #[test]
    fn test_missing_plan_yields_none() {
        let mission = MissionContext::new(MissionParams::new("r"));
        assert!(build_draft(&mission).is_none());
    }
}
