// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Plan-driven merges, end to end: TOML plan in, merged XML text out.

use oximerge::{config::MergePlan, descriptor::Descriptor};

use indoc::indoc;
use pretty_assertions::assert_eq;

fn plan() -> MergePlan {
    indoc! {r#"
        default = "preserve"

        [schema]
        name = "web-app-2.3"
        root = "web-app"

        [[schema.tag]]
        name = "display-name"
        unique = true

        [[schema.tag]]
        name = "context-param"
        identifier = "param-name"

        [[schema.tag]]
        name = "servlet"
        identifier = "servlet-name"

        [[schema.tag]]
        name = "servlet-mapping"
        identifier = "url-pattern"

        [[schema.tag]]
        name = "security-constraint"
        identifier = "web-resource-collection/web-resource-name"

        [[rule]]
        tag = "servlet"
        strategy = "overwrite"

        [[rule]]
        tag = "context-param"
        strategy = "template"
        template = '<context-param><param-name>$left:param-name</param-name><param-value>$left:param-value,$right:param-value</param-value></context-param>'
    "#}
    .parse()
    .expect("merge plan fixture must parse")
}

fn descriptor(plan: &MergePlan, xml: &str) -> Descriptor {
    Descriptor::parse(plan.schema(), xml).expect("descriptor fixture must parse")
}

#[test]
fn plan_driven_merge_produces_expected_document() -> anyhow::Result<()> {
    let plan = plan();
    let left = descriptor(
        &plan,
        indoc! {r#"
            <web-app>
              <display-name>storefront</display-name>
              <context-param>
                <param-name>modes</param-name>
                <param-value>retail</param-value>
              </context-param>
              <servlet>
                <servlet-name>dispatch</servlet-name>
                <servlet-class>org.acme.DispatchOld</servlet-class>
              </servlet>
              <security-constraint>
                <web-resource-collection>
                  <web-resource-name>admin</web-resource-name>
                </web-resource-collection>
              </security-constraint>
            </web-app>
        "#},
    );
    let right = descriptor(
        &plan,
        indoc! {r#"
            <web-app>
              <context-param>
                <param-name>modes</param-name>
                <param-value>wholesale</param-value>
              </context-param>
              <servlet>
                <servlet-name>dispatch</servlet-name>
                <servlet-class>org.acme.Dispatch</servlet-class>
              </servlet>
              <servlet-mapping>
                <url-pattern>/dispatch/*</url-pattern>
                <servlet-name>dispatch</servlet-name>
              </servlet-mapping>
              <security-constraint>
                <web-resource-collection>
                  <web-resource-name>reports</web-resource-name>
                </web-resource-collection>
              </security-constraint>
            </web-app>
        "#},
    );

    let merger = plan.merger()?;
    let (merged, report) = merger.merge(&left, &right)?;

    // display-name survives untouched under the preserve default; the
    // matched context-param pair goes through the template; the matched
    // servlet pair is overwritten; the right-only servlet-mapping is added;
    // the two security constraints carry distinct keys, so both survive.
    let result = merged.to_string();
    let expect = indoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <web-app>
          <display-name>storefront</display-name>
          <context-param>
            <param-name>modes</param-name>
            <param-value>retail,wholesale</param-value>
          </context-param>
          <servlet>
            <servlet-name>dispatch</servlet-name>
            <servlet-class>org.acme.Dispatch</servlet-class>
          </servlet>
          <servlet-mapping>
            <url-pattern>/dispatch/*</url-pattern>
            <servlet-name>dispatch</servlet-name>
          </servlet-mapping>
          <security-constraint>
            <web-resource-collection>
              <web-resource-name>admin</web-resource-name>
            </web-resource-collection>
          </security-constraint>
          <security-constraint>
            <web-resource-collection>
              <web-resource-name>reports</web-resource-name>
            </web-resource-collection>
          </security-constraint>
        </web-app>
    "#};
    assert_eq!(result, expect);

    assert_eq!(report.count_for("display-name"), 0);
    assert_eq!(report.count_for("context-param"), 1);
    assert_eq!(report.count_for("servlet"), 1);
    assert_eq!(report.count_for("servlet-mapping"), 1);
    assert_eq!(report.count_for("security-constraint"), 1);
    assert_eq!(report.total(), 4);

    Ok(())
}

#[test]
fn choose_rule_applies_different_policies_to_same_tag() -> anyhow::Result<()> {
    let plan: MergePlan = indoc! {r#"
        default = "preserve"

        [schema]
        name = "web-app-2.3"
        root = "web-app"

        [[schema.tag]]
        name = "servlet"
        identifier = "servlet-name"

        [[rule]]
        tag = "servlet"
        strategy = "choose"
        default = "skip"

        [rule.choice]
        dispatch = "overwrite"
    "#}
    .parse()?;

    let left = descriptor(
        &plan,
        indoc! {r#"
            <web-app>
              <servlet>
                <servlet-name>dispatch</servlet-name>
                <servlet-class>org.acme.DispatchOld</servlet-class>
              </servlet>
              <servlet>
                <servlet-name>upload</servlet-name>
                <servlet-class>org.acme.UploadOld</servlet-class>
              </servlet>
            </web-app>
        "#},
    );
    let right = descriptor(
        &plan,
        indoc! {r#"
            <web-app>
              <servlet>
                <servlet-name>dispatch</servlet-name>
                <servlet-class>org.acme.Dispatch</servlet-class>
              </servlet>
              <servlet>
                <servlet-name>upload</servlet-name>
                <servlet-class>org.acme.Upload</servlet-class>
              </servlet>
            </web-app>
        "#},
    );

    let merger = plan.merger()?;
    let (merged, report) = merger.merge(&left, &right)?;

    let class_of = |name: &str| {
        merged
            .elements("servlet")
            .find(|servlet| servlet.find_text("servlet-name") == Some(name))
            .and_then(|servlet| servlet.find_text("servlet-class"))
            .map(str::to_owned)
    };

    // "dispatch" resolves to overwrite, "upload" falls back to skip.
    assert_eq!(class_of("dispatch"), Some("org.acme.Dispatch".into()));
    assert_eq!(class_of("upload"), Some("org.acme.UploadOld".into()));
    assert_eq!(report.count_for("servlet"), 1);

    Ok(())
}
