use crate::types::RequirementIssue;

/// Prompt asking for `count` requirements for `product_request`.
pub fn requirements_prompt(product_request: &str, count: u32) -> String {
    format!(
        r#"You are a senior software requirements analyst. Given this high-level request:
"{product_request}"

Generate a comprehensive list of {count} essential requirements for this application.
Format each requirement as JSON with these fields:
- title: Short title of the requirement (max 10 words)
- description: Detailed explanation (2-3 sentences)
- acceptance_criteria: List of 3 criteria that must be met

Return ONLY a valid JSON array of these requirements with no additional text.
"#
    )
}

/// Prompt asking for `count` test cases verifying `issue`.
pub fn test_cases_prompt(issue: &RequirementIssue, count: u32) -> String {
    let example: Vec<String> = (1..=count)
        .map(|n| {
            format!(
                r#"  {{
    "title": "Test Title {n}",
    "steps": ["Step 1: Do something", "Step 2: Verify the outcome"],
    "expected_result": "Expected result {n}"
  }}"#
            )
        })
        .collect();

    format!(
        r#"You are a QA testing expert. For this requirement:

{title}
{description}

Generate {count} test cases that would verify this requirement.
Each test case should have:
- title: Short descriptive title of the test
- steps: An array of strings for each step (NOT numbered internally)
- expected_result: What should happen if the test passes

Return ONLY a valid JSON array like this:
[
{example}
]

IMPORTANT: Ensure your response is ONLY the JSON array with no additional explanation or formatting.
"#,
        title = issue.title,
        description = issue.description,
        example = example.join(",\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::recover_json;
    use crate::types::IssueKey;

    #[test]
    fn requirements_prompt_carries_request_and_count() {
        let p = requirements_prompt("A todo app", 4);
        assert!(p.contains("\"A todo app\""));
        assert!(p.contains("list of 4 essential requirements"));
    }

    #[test]
    fn test_cases_prompt_example_is_valid_json() {
        let issue = RequirementIssue {
            key: IssueKey::new("FLT-1"),
            title: "Search flights".into(),
            description: "Users search by number.\n\nAcceptance Criteria:\n- Works\n".into(),
        };
        let p = test_cases_prompt(&issue, 3);
        assert!(p.contains("Search flights\nUsers search by number."));
        assert!(p.contains("Generate 3 test cases"));

        let start = p.find('[').unwrap();
        let end = p.rfind(']').unwrap();
        let example = recover_json(&p[start..=end]).unwrap();
        assert_eq!(example.value.as_array().unwrap().len(), 3);
    }
}
