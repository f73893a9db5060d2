//! Descriptor chain.
//!
//! A packet's head descriptor exclusively owns its successor, which owns its
//! own successor and so on. Releasing a node releases its tail first.

use super::{Descriptor, DescriptorType};

/// One link of a descriptor chain.
#[derive(Debug, Clone)]
pub struct DescriptorNode {
    descriptor: Descriptor,
    next: Option<Box<DescriptorNode>>,
}

impl DescriptorNode {
    pub fn new(descriptor: Descriptor) -> Self {
        Self {
            descriptor,
            next: None,
        }
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn descriptor_mut(&mut self) -> &mut Descriptor {
        &mut self.descriptor
    }

    pub fn descriptor_type(&self) -> DescriptorType {
        self.descriptor.descriptor_type()
    }

    pub fn next(&self) -> Option<&DescriptorNode> {
        self.next.as_deref()
    }

    /// Insert `node` as the immediate successor. The previous successor
    /// becomes the successor of `node`'s own tail, so repeated attaches keep
    /// every descriptor in the chain.
    pub fn attach(&mut self, node: DescriptorNode) {
        tracing::debug!(
            head = %self.descriptor_type(),
            attached = %node.descriptor_type(),
            "attach descriptor"
        );
        let mut inserted = Box::new(node);
        if let Some(old) = self.next.take() {
            inserted.append(old);
        }
        self.next = Some(inserted);
    }

    fn append(&mut self, tail: Box<DescriptorNode>) {
        match self.next.as_deref_mut() {
            Some(next) => next.append(tail),
            None => self.next = Some(tail),
        }
    }

    /// First node of the given type, starting with this one.
    pub fn find(&self, descriptor_type: DescriptorType) -> Option<&DescriptorNode> {
        self.iter().find(|n| n.descriptor_type() == descriptor_type)
    }

    pub fn find_mut(&mut self, descriptor_type: DescriptorType) -> Option<&mut DescriptorNode> {
        if self.descriptor_type() == descriptor_type {
            return Some(self);
        }
        self.next.as_deref_mut()?.find_mut(descriptor_type)
    }

    /// Iterate over this node and every successor.
    pub fn iter(&self) -> ChainIter<'_> {
        ChainIter { node: Some(self) }
    }

    /// Number of nodes including this one.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Release the tail, then unbind this node. The node stays usable and
    /// can be rebound.
    pub fn release(&mut self) {
        if let Some(mut next) = self.next.take() {
            next.release();
        }
        self.descriptor.unbind();
    }
}

impl From<Descriptor> for DescriptorNode {
    fn from(descriptor: Descriptor) -> Self {
        Self::new(descriptor)
    }
}

impl<'a> IntoIterator for &'a DescriptorNode {
    type Item = &'a DescriptorNode;
    type IntoIter = ChainIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a descriptor chain.
#[derive(Debug, Clone)]
pub struct ChainIter<'a> {
    node: Option<&'a DescriptorNode>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a DescriptorNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.node?;
        self.node = node.next();
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{IpfBuilder, PcapBuilder};

    fn node(ty: DescriptorType) -> DescriptorNode {
        DescriptorNode::new(Descriptor::new(ty))
    }

    fn types(head: &DescriptorNode) -> Vec<DescriptorType> {
        head.iter().map(|n| n.descriptor_type()).collect()
    }

    #[test]
    fn test_attach_inserts_after_head() {
        let mut head = node(DescriptorType::Type2);
        head.attach(node(DescriptorType::Ipf));
        head.attach(node(DescriptorType::Pcap));

        // Insertion: the newest node sits directly after the head and the
        // earlier successor is kept behind it.
        assert_eq!(
            types(&head),
            [DescriptorType::Type2, DescriptorType::Pcap, DescriptorType::Ipf]
        );
        assert_eq!(head.len(), 3);
    }

    #[test]
    fn test_attach_chain_keeps_inserted_tail() {
        let mut head = node(DescriptorType::Type2);
        head.attach(node(DescriptorType::Ipf));

        let mut pair = node(DescriptorType::Pcap);
        pair.attach(node(DescriptorType::Ipf));
        head.attach(pair);

        assert_eq!(
            types(&head),
            [
                DescriptorType::Type2,
                DescriptorType::Pcap,
                DescriptorType::Ipf,
                DescriptorType::Ipf
            ]
        );
    }

    #[test]
    fn test_find() {
        let mut head = node(DescriptorType::Type2);
        assert!(head.find(DescriptorType::Ipf).is_none());
        assert_eq!(
            head.find(DescriptorType::Type2).unwrap().descriptor_type(),
            DescriptorType::Type2
        );

        head.attach(node(DescriptorType::Ipf));
        let ipf = head.find_mut(DescriptorType::Ipf).unwrap();
        ipf.descriptor_mut()
            .bind(IpfBuilder::new().identification(7).build())
            .unwrap();

        let found = head.find(DescriptorType::Ipf).unwrap();
        assert_eq!(found.descriptor().as_ipf().unwrap().identification(), 7);
    }

    #[test]
    fn test_iter_restarts_from_head() {
        let mut head = node(DescriptorType::Type2);
        head.attach(node(DescriptorType::Ipf));
        assert_eq!((&head).into_iter().count(), 2);
        assert_eq!(head.iter().count(), 2);
    }

    #[test]
    fn test_release_drops_tail() {
        let mut head = node(DescriptorType::Pcap);
        head.descriptor_mut()
            .bind(PcapBuilder::new(60).build())
            .unwrap();
        head.attach(node(DescriptorType::Ipf));
        head.attach(node(DescriptorType::Ipf));

        head.release();
        assert!(head.next().is_none());
        assert_eq!(head.len(), 1);
        assert!(!head.descriptor().is_bound());

        // Safe to rebind after release.
        head.descriptor_mut()
            .bind(PcapBuilder::new(42).build())
            .unwrap();
        assert_eq!(head.descriptor().as_packet().unwrap().capture_length(), 42);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut head = node(DescriptorType::Pcap);
        head.descriptor_mut()
            .bind(PcapBuilder::new(60).build())
            .unwrap();
        let mut ipf = node(DescriptorType::Ipf);
        ipf.descriptor_mut()
            .bind(IpfBuilder::new().identification(9).build())
            .unwrap();
        head.attach(ipf);

        let copy = head.clone();
        head.release();

        assert_eq!(copy.len(), 2);
        let ipf = copy.find(DescriptorType::Ipf).unwrap();
        assert_eq!(ipf.descriptor().as_ipf().unwrap().identification(), 9);
    }
}
