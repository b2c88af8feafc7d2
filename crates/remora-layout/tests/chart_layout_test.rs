use remora_core::{ChartOptions, parse};
use remora_layout::model::{Diagram, PathSegment};
use remora_layout::{LayoutOptions, layout_chart};
use serde_json::json;

fn layout(dsl: &str) -> Diagram {
    let model = parse(dsl).expect("chart parses");
    layout_chart(&model, &ChartOptions::default(), &LayoutOptions::default()).expect("layout ok")
}

fn approx_gt(a: f64, b: f64) -> bool {
    a > b + 1e-6
}

fn segment_end(segment: &PathSegment) -> (f64, f64) {
    match *segment {
        PathSegment::Line { x, y } | PathSegment::Curve { x, y, .. } => (x, y),
    }
}

#[test]
fn minimal_chart_lays_out_two_boxes_and_one_line() {
    let diagram = layout("st=>start\ne=>end\nst->e");

    assert_eq!(diagram.nodes.len(), 2);
    assert_eq!(diagram.lines.len(), 1);
    let st = diagram.node_by_key("st").expect("start node");
    let e = diagram.node_by_key("e").expect("end node");
    assert!(approx_gt(e.y, st.y + st.height));

    // Tall enough for both boxes, the connecting gap, and the stroke on both edges.
    let line_width = 3.0;
    assert!(diagram.bounds.canvas_height >= st.height + e.height + 50.0 + 2.0 * line_width - 1e-6);
}

#[test]
fn sequential_operations_share_a_column() {
    let diagram = layout(
        "st=>start\na=>operation: one\nb=>operation: two\nc=>operation: three\ne=>end\n\
         st->a->b->c->e",
    );

    let keys = ["st", "a", "b", "c", "e"];
    let centers: Vec<(f64, f64)> = keys
        .iter()
        .map(|k| {
            let n = diagram.node_by_key(k).expect("node");
            (n.x + n.width / 2.0, n.y + n.height / 2.0)
        })
        .collect();

    for pair in centers.windows(2) {
        assert!(approx_gt(pair[1].1, pair[0].1), "flow must descend");
        assert!((pair[1].0 - pair[0].0).abs() < 1e-6, "flow must stay centered");
    }
}

#[test]
fn condition_defaults_put_yes_below_and_no_beside() {
    let diagram = layout(
        "c=>condition: ready?\ny=>operation: ship\nn=>operation: fix\nc(yes)->y\nc(no)->n",
    );

    let c = diagram.node_by_key("c").expect("condition");
    let y = diagram.node_by_key("y").expect("yes branch");
    let n = diagram.node_by_key("n").expect("no branch");

    assert!(approx_gt(y.y, c.y + c.height));
    assert!(approx_gt(n.x, c.x + c.width));

    let labels: Vec<&str> = diagram
        .lines
        .iter()
        .filter_map(|l| l.label.as_ref().map(|lab| lab.text.as_str()))
        .collect();
    assert_eq!(labels, ["yes", "no"]);
}

#[test]
fn reconverging_branches_share_one_target_node() {
    let diagram = layout(
        "c=>condition\ny=>operation: left\nn=>operation: right\ne=>end\n\
         c(yes)->y\nc(no)->n\ny->e\nn->e",
    );

    assert_eq!(diagram.nodes.iter().filter(|n| n.key == "e").count(), 1);
    let e_index = diagram.nodes.iter().position(|n| n.key == "e").expect("end");
    let incoming: Vec<_> = diagram.lines.iter().filter(|l| l.to == e_index).collect();
    assert_eq!(incoming.len(), 2);

    // Both lines terminate on the shared node's top anchor x.
    let e = &diagram.nodes[e_index];
    for line in incoming {
        let (end_x, _) = segment_end(line.segments.last().expect("segments"));
        assert!((end_x - (e.x + e.width / 2.0)).abs() < 1e-6);
    }
}

#[test]
fn loop_back_routes_around_the_column() {
    let diagram = layout(
        "st=>start\nop=>operation: work\nc=>condition: done?\ne=>end\n\
         st->op->c\nc(yes)->e\nc(no)->op",
    );

    let c = diagram.node_by_key("c").expect("condition");
    let op = diagram.node_by_key("op").expect("operation");
    assert!(approx_gt(c.y, op.y));

    // The no-line climbs back up, so some routed point must sit above the condition box.
    let c_index = diagram.nodes.iter().position(|n| n.key == "c").expect("c");
    let op_index = diagram.nodes.iter().position(|n| n.key == "op").expect("op");
    let back = diagram
        .lines
        .iter()
        .find(|l| l.from == c_index && l.to == op_index)
        .expect("loop-back line");
    assert!(
        back.segments
            .iter()
            .map(segment_end)
            .any(|(_, y)| y < c.y)
    );
}

#[test]
fn parallel_split_fans_out_three_ways() {
    let diagram = layout(
        "p=>parallel: fan out\na=>operation: down\nb=>operation: side\nc=>operation: up\n\
         p(path1)->a\np(path2)->b\np(path3)->c",
    );

    let p = diagram.node_by_key("p").expect("parallel");
    let a = diagram.node_by_key("a").expect("path1");
    let b = diagram.node_by_key("b").expect("path2");
    let c = diagram.node_by_key("c").expect("path3");

    assert!(approx_gt(a.y, p.y + p.height));
    assert!(approx_gt(b.x, p.x + p.width));
    assert!(approx_gt(p.y, c.y + c.height));
}

#[test]
fn user_options_stretch_the_gap() {
    let model = parse("st=>start\ne=>end\nst->e").expect("chart parses");
    let options = ChartOptions::merged(&json!({"line-length": 120.0}));
    let diagram =
        layout_chart(&model, &options, &LayoutOptions::default()).expect("layout ok");

    let st = diagram.node_by_key("st").expect("start");
    let e = diagram.node_by_key("e").expect("end");
    assert!((e.y - (st.y + st.height) - 120.0).abs() < 1e-6);
}

#[test]
fn crossing_lines_pick_up_a_hop_curve() {
    // The no-branch swings left underneath the yes-column, so its horizontal leg
    // crosses the earlier y->b drop and must hop over it.
    let diagram = layout(
        "c=>condition\ny=>operation\nb=>operation\nl=>operation\nn=>operation\n\
         c(yes)->y\nc(no)->n\ny->b\nb(left)->l\nn->l",
    );

    let index = |key: &str| diagram.nodes.iter().position(|n| n.key == key).expect(key);
    let line = |from: &str, to: &str| {
        diagram
            .lines
            .iter()
            .find(|l| l.from == index(from) && l.to == index(to))
            .expect("routed line")
    };

    assert!(
        line("n", "l")
            .segments
            .iter()
            .any(|s| matches!(s, PathSegment::Curve { .. }))
    );
    assert!(
        line("y", "b")
            .segments
            .iter()
            .all(|s| matches!(s, PathSegment::Line { .. }))
    );
}

#[test]
fn every_routed_coordinate_is_finite() {
    let diagram = layout(
        "st=>start\nio=>inputoutput: read\nsub=>subroutine: helper\nc=>condition: more?\ne=>end\n\
         st->io->sub->c\nc(yes)->io\nc(no)->e",
    );

    for node in &diagram.nodes {
        assert!(node.width.is_finite() && node.width > 0.0);
        assert!(node.height.is_finite() && node.height > 0.0);
        assert!(node.x.is_finite() && node.y.is_finite());
    }
    for line in &diagram.lines {
        assert!(line.start_x.is_finite() && line.start_y.is_finite());
        for segment in &line.segments {
            let (x, y) = segment_end(segment);
            assert!(x.is_finite() && y.is_finite());
        }
    }
}
