use serde::de::{self, SeqAccess};
use serde::de::{Deserialize, Deserializer, Visitor};
use serde::ser::{Serialize, SerializeTuple, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// Search results of a single node, recorded as a training target.
#[derive(PartialEq, Debug, Clone)]
pub struct NodeMetrics<A> {
    /// The total number of visits of the node. Equals children.visits.sum().
    pub visits: usize,
    /// Value of the node from the perspective of the player to move, as predicted or scored by the rules.
    pub value: f32,
    /// The legal actions of the node, in canonical order.
    pub children: Vec<EdgeMetrics<A>>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct EdgeMetrics<A> {
    action: A,
    visits: usize,
    /// Mean backed up value of the edge for the player choosing it.
    q: f32,
    /// The prior used by selection, after masking and renormalization.
    prior: f32,
}

impl<A> EdgeMetrics<A> {
    pub fn new(action: A, visits: usize, q: f32, prior: f32) -> Self {
        Self {
            action,
            visits,
            q,
            prior,
        }
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    pub fn visits(&self) -> usize {
        self.visits
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    pub fn prior(&self) -> f32 {
        self.prior
    }
}

impl<A> Serialize for NodeMetrics<A>
where
    A: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tup = serializer.serialize_tuple(3)?;
        tup.serialize_element(&self.visits)?;
        tup.serialize_element(&self.value)?;
        tup.serialize_element(&self.children)?;

        tup.end()
    }
}

struct NodeMetricsVisitor<A> {
    marker: PhantomData<A>,
}

impl<A> NodeMetricsVisitor<A> {
    fn new() -> Self {
        NodeMetricsVisitor {
            marker: PhantomData,
        }
    }
}

impl<'de, A> Visitor<'de> for NodeMetricsVisitor<A>
where
    A: Deserialize<'de>,
{
    type Value = NodeMetrics<A>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("NodeMetrics")
    }

    fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
    where
        S: SeqAccess<'de>,
    {
        Ok(NodeMetrics {
            visits: seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(0, &self))?,
            value: seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(1, &self))?,
            children: seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(2, &self))?,
        })
    }
}

impl<'de, A> Deserialize<'de> for NodeMetrics<A>
where
    A: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_tuple(3, NodeMetricsVisitor::new())
    }
}

impl<A> Serialize for EdgeMetrics<A>
where
    A: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tup = serializer.serialize_tuple(4)?;

        tup.serialize_element(&self.action)?;
        tup.serialize_element(&self.visits)?;
        tup.serialize_element(&self.q)?;
        tup.serialize_element(&self.prior)?;

        tup.end()
    }
}

struct EdgeMetricsVisitor<A> {
    marker: PhantomData<A>,
}

impl<A> EdgeMetricsVisitor<A> {
    fn new() -> Self {
        EdgeMetricsVisitor {
            marker: PhantomData,
        }
    }
}

impl<'de, A> Visitor<'de> for EdgeMetricsVisitor<A>
where
    A: Deserialize<'de>,
{
    type Value = EdgeMetrics<A>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("EdgeMetrics")
    }

    fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
    where
        S: SeqAccess<'de>,
    {
        Ok(EdgeMetrics {
            action: seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(0, &self))?,
            visits: seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(1, &self))?,
            q: seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(2, &self))?,
            prior: seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(3, &self))?,
        })
    }
}

impl<'de, A> Deserialize<'de> for EdgeMetrics<A>
where
    A: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_tuple(4, EdgeMetricsVisitor::new())
    }
}
