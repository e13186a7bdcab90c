use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::events::EventData;

/// Чистая проверка над данными события
pub type Predicate = Arc<dyn Fn(&EventData) -> bool + Send + Sync>;

/// Именованный лист дерева предикатов
#[derive(Clone)]
pub struct Leaf {
    name: Cow<'static, str>,
    test: Predicate,
}

impl Leaf {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn test(&self, data: &EventData) -> bool {
        (self.test)(data)
    }
}

/// Дерево предикатов: лист, конъюнкция или дизъюнкция.
///
/// Вычисление не имеет побочных эффектов на реестр и диспетчер, поэтому один
/// и тот же узел можно разделять между несколькими подписками и вычислять
/// одновременно.
#[derive(Clone)]
pub enum PredicateNode {
    Leaf(Leaf),
    All(Vec<PredicateNode>),
    Any(Vec<PredicateNode>),
}

impl PredicateNode {
    pub fn leaf<F>(name: impl Into<Cow<'static, str>>, test: F) -> Self
    where
        F: Fn(&EventData) -> bool + Send + Sync + 'static,
    {
        PredicateNode::Leaf(Leaf {
            name: name.into(),
            test: Arc::new(test),
        })
    }

    /// `All`: слева направо до первого `false`, пустой список даёт `true`.
    /// `Any`: слева направо до первого `true`, пустой список даёт `false`.
    pub fn evaluate(&self, data: &EventData) -> bool {
        match self {
            PredicateNode::Leaf(leaf) => leaf.test(data),
            PredicateNode::All(nodes) => nodes.iter().all(|node| node.evaluate(data)),
            PredicateNode::Any(nodes) => nodes.iter().any(|node| node.evaluate(data)),
        }
    }

    /// `self И other`; вложенные `All` сливаются в один уровень
    pub fn and(self, other: PredicateNode) -> Self {
        match self {
            PredicateNode::All(mut nodes) => {
                nodes.push(other);
                PredicateNode::All(nodes)
            }
            node => PredicateNode::All(vec![node, other]),
        }
    }

    /// `self ИЛИ other`; вложенные `Any` сливаются в один уровень
    pub fn or(self, other: PredicateNode) -> Self {
        match self {
            PredicateNode::Any(mut nodes) => {
                nodes.push(other);
                PredicateNode::Any(nodes)
            }
            node => PredicateNode::Any(vec![node, other]),
        }
    }

    /// Количество листьев в дереве
    pub fn leaf_count(&self) -> usize {
        match self {
            PredicateNode::Leaf(_) => 1,
            PredicateNode::All(nodes) | PredicateNode::Any(nodes) => {
                nodes.iter().map(PredicateNode::leaf_count).sum()
            }
        }
    }
}

/// Конъюнкция узлов
pub fn all(nodes: impl IntoIterator<Item = PredicateNode>) -> PredicateNode {
    PredicateNode::All(nodes.into_iter().collect())
}

/// Дизъюнкция узлов
pub fn any(nodes: impl IntoIterator<Item = PredicateNode>) -> PredicateNode {
    PredicateNode::Any(nodes.into_iter().collect())
}

impl fmt::Debug for PredicateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for PredicateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (op, nodes) = match self {
            PredicateNode::Leaf(leaf) => return write!(f, "{}", leaf.name),
            PredicateNode::All(nodes) => ("all", nodes),
            PredicateNode::Any(nodes) => ("any", nodes),
        };

        write!(f, "{}(", op)?;
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", node)?;
        }
        write!(f, ")")
    }
}
