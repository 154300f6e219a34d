use std::collections::HashMap;

use crate::registry::Namespace;

/// Renders the dependency graph of an event as a Mermaid flowchart.
///
/// Edges point from a dependency to its dependent. Dependencies that are not
/// registered in the event are drawn as dashed placeholder nodes.
pub(crate) fn render_mermaid<T, A>(event: &str, namespace: &Namespace<T, A>) -> String {
    let mut f = String::from("graph LR\n");
    f.push_str(&format!("    %% event: {}\n", escape(event)));

    let ids: HashMap<&str, usize> = namespace
        .keys()
        .enumerate()
        .map(|(id, name)| (name.as_str(), id))
        .collect();

    for (id, name) in namespace.keys().enumerate() {
        f.push_str(&format!("    {id}[\"{}\"]\n", escape(name)));
    }

    let mut missing = 0;
    for (target, task) in namespace.values().enumerate() {
        for dep in task.distinct_dependencies() {
            match ids.get(dep) {
                Some(source) => f.push_str(&format!("    {source} --> {target}\n")),
                None => {
                    f.push_str(&format!("    missing{missing}[\"{} (missing)\"]\n", escape(dep)));
                    f.push_str(&format!("    missing{missing} -.-> {target}\n"));
                    missing += 1;
                }
            }
        }
    }

    f
}

fn escape(name: &str) -> String {
    name.replace('"', "\\\"")
}
